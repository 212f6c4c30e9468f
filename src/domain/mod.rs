pub mod member;
pub mod money;
pub mod subscription;

pub use member::{Dni, DniError, Member, MemberStatus};
pub use money::{Money, MoneyError};
pub use subscription::{Branch, Plan, Subscription, SubscriptionStatus};

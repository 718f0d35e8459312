//! 领域模型
//!
//! - `course`: 课程定义（只读目录）
//! - `progress`: 学习进度、课时、测验结果
//! - `achievement`: 成就定义、解锁条件、用户成就
//! - `certificate`: 结业证书
//! - `notification`: 站内通知记录
//! - `enums`: 共用枚举

mod achievement;
mod certificate;
mod course;
mod enums;
mod notification;
mod progress;

pub use achievement::*;
pub use certificate::*;
pub use course::*;
pub use enums::*;
pub use notification::*;
pub use progress::*;

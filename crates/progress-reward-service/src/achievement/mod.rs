//! 成就评估模块
//!
//! - `stats`: 从进度记录聚合用户统计
//! - `evaluator`: 按成就条件判定是否满足（纯函数）

mod evaluator;
mod stats;

pub use evaluator::{AchievementEvaluator, AchievementProgress};
pub use stats::{ScoreRecord, UserStats};

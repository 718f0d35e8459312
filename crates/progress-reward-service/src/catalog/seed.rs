//! 内置目录数据
//!
//! 可可种植课程与默认成就。

use crate::error::Result;
use crate::models::{
    AchievementCondition, AchievementDefinition, CourseDefinition, CourseTarget, QuizRule, Rarity,
};

const CACAO_COURSES: &[(&str, &str, &[&str])] = &[
    (
        "cacao-basics",
        "Cacao Basics",
        &["intro-cacao", "cacao-history", "cacao-varieties", "growing-conditions"],
    ),
    (
        "planting-techniques",
        "Planting Techniques",
        &["soil-requirements", "shade-management", "nursery-care", "planting-methods"],
    ),
    (
        "harvest-processing",
        "Harvest & Processing",
        &[
            "harvest-timing",
            "harvest-methods",
            "pod-breaking",
            "fermentation-process",
            "fermentation-troubleshooting",
            "drying-methods",
            "moisture-control",
            "storage-solutions",
            "quality-assessment",
            "grading-standards",
            "common-defects",
        ],
    ),
    (
        "pest-disease",
        "Pest & Disease Management",
        &[
            "pest-identification",
            "pest-lifecycle",
            "pest-damage",
            "disease-identification",
            "disease-symptoms",
            "disease-spread",
            "ipm-basics",
            "monitoring-techniques",
            "control-methods",
            "biological-control",
            "natural-pesticides",
            "cultural-practices",
            "pesticide-types",
            "application-methods",
            "safety-measures",
        ],
    ),
    (
        "cloning-techniques",
        "Types of Cloning in Cacao",
        &[
            "why-clone-cacao",
            "cloning-basics",
            "cloning-methods-overview",
            "grafting-techniques",
            "nursery-establishment",
            "acclimatization",
        ],
    ),
    (
        "care-management",
        "Care Management",
        &[
            "irrigation-methods",
            "water-conservation",
            "drainage-systems",
            "pruning-techniques",
            "canopy-management",
            "pruning-schedule",
            "essential-nutrients",
            "fertilization",
            "soil-health",
        ],
    ),
    (
        "gap-practices",
        "GAP (Good Agricultural Practices)",
        &["gap-principles", "benefits-gap", "regulatory-framework"],
    ),
    (
        "cacao-history",
        "Cacao History",
        &["ancient-origins", "cultural-significance", "global-spread", "modern-industry"],
    ),
];

/// 可可种植课程目录
pub fn cacao_courses() -> Result<Vec<CourseDefinition>> {
    CACAO_COURSES
        .iter()
        .map(|(id, title, lessons)| {
            CourseDefinition::new(*id, *title, lessons.iter().map(|l| l.to_string()).collect())
        })
        .collect()
}

fn achievement(
    id: &str,
    name: &str,
    description: &str,
    points: u32,
    rarity: Rarity,
    sort_order: i32,
    condition: AchievementCondition,
) -> AchievementDefinition {
    AchievementDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        points,
        rarity,
        sort_order,
        is_active: true,
        condition,
    }
}

fn courses(target: u32) -> AchievementCondition {
    AchievementCondition::CourseCompletion {
        target: CourseTarget::Count(target),
        min_average_score: None,
    }
}

fn quiz_points(target: u32) -> AchievementCondition {
    AchievementCondition::QuizScore(QuizRule::CumulativePoints { target })
}

/// 默认成就目录
pub fn cacao_achievements() -> Vec<AchievementDefinition> {
    vec![
        achievement(
            "first-steps",
            "First Steps",
            "Complete your first cacao course",
            10,
            Rarity::Common,
            1,
            courses(1),
        ),
        achievement(
            "cacao-beginner",
            "Cacao Beginner",
            "Complete 3 cacao courses",
            25,
            Rarity::Common,
            2,
            courses(3),
        ),
        achievement(
            "dedicated-farmer",
            "Dedicated Farmer",
            "Complete 5 cacao courses",
            50,
            Rarity::Uncommon,
            3,
            courses(5),
        ),
        achievement(
            "high-achiever",
            "High Achiever",
            "Score over 500 total points",
            75,
            Rarity::Uncommon,
            4,
            quiz_points(500),
        ),
        achievement(
            "expert-farmer",
            "Expert Farmer",
            "Complete 8 cacao courses",
            100,
            Rarity::Rare,
            5,
            courses(8),
        ),
        achievement(
            "quiz-master",
            "Quiz Master",
            "Score over 1000 total points",
            150,
            Rarity::Rare,
            6,
            quiz_points(1000),
        ),
        achievement(
            "consistent-learner",
            "Consistent Learner",
            "Learn on 3 consecutive days",
            30,
            Rarity::Common,
            7,
            AchievementCondition::Streak { target: 3 },
        ),
        achievement(
            "cacao-master",
            "Cacao Master",
            "Complete all available courses",
            200,
            Rarity::Epic,
            8,
            AchievementCondition::CourseCompletion {
                target: CourseTarget::All,
                min_average_score: None,
            },
        ),
        achievement(
            "early-bird",
            "Early Bird",
            "Spend a full week of study time",
            40,
            Rarity::Uncommon,
            9,
            AchievementCondition::TimeSpent {
                target_minutes: 7 * 24 * 60,
            },
        ),
        achievement(
            "night-owl",
            "Night Owl",
            "Study for 3 hours",
            35,
            Rarity::Uncommon,
            10,
            AchievementCondition::TimeSpent { target_minutes: 180 },
        ),
        achievement(
            "perfectionist",
            "Perfectionist",
            "Score 90% or higher on a quiz",
            60,
            Rarity::Rare,
            11,
            AchievementCondition::QuizScore(QuizRule::BestScore { min_score: 90 }),
        ),
        achievement(
            "enthusiast",
            "Enthusiast",
            "Complete 10 cacao courses",
            45,
            Rarity::Uncommon,
            12,
            courses(10),
        ),
        achievement(
            "persistent-farmer",
            "Persistent Farmer",
            "Continue learning for 7 days straight",
            55,
            Rarity::Rare,
            13,
            AchievementCondition::Streak { target: 7 },
        ),
        achievement(
            "quick-learner",
            "Quick Learner",
            "Complete 2 cacao courses",
            65,
            Rarity::Rare,
            14,
            courses(2),
        ),
        achievement(
            "knowledge-seeker",
            "Knowledge Seeker",
            "Score over 1500 total points",
            125,
            Rarity::Epic,
            15,
            quiz_points(1500),
        ),
        achievement(
            "cacao-champion",
            "Cacao Champion",
            "Complete 10 courses with 80% average",
            250,
            Rarity::Legendary,
            16,
            AchievementCondition::CourseCompletion {
                target: CourseTarget::Count(10),
                min_average_score: Some(80),
            },
        ),
    ]
}

//! 成就评估性能基准测试
//!
//! 测试覆盖：
//! - 不同课程数量下的用户统计聚合
//! - 内置成就目录的全量评估
//! - 条件载荷解码

use std::collections::HashSet;
use std::hint::black_box;

use chrono::{Duration, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;

use progress_reward::achievement::{AchievementEvaluator, UserStats};
use progress_reward::catalog::seed::cacao_achievements;
use progress_reward::models::{
    AchievementCategory, AchievementCondition, CompletedLesson, CourseProgress, QuizResult,
};

/// 构造 `courses` 门课程的学习记录，每门 8 个课时、2 次测验，学习日期逐日后移
fn learner_records(courses: usize) -> Vec<CourseProgress> {
    let start = Utc::now() - Duration::days(courses as i64);
    (0..courses)
        .map(|c| {
            let day = start + Duration::days(c as i64);
            let mut progress = CourseProgress::new("bench-user", format!("course-{c}"), day);
            for l in 0..8 {
                progress.apply_lesson(
                    CompletedLesson {
                        lesson_id: format!("lesson-{l}"),
                        title: format!("Lesson {l}"),
                        completed_at: day,
                        time_spent_minutes: 30,
                    },
                    8,
                );
            }
            for q in 0..2u8 {
                progress.record_quiz(QuizResult {
                    lesson_id: format!("quiz-{q}"),
                    score: 70 + q * 15,
                    total_questions: 10,
                    correct_answers: 8,
                    completed_at: day,
                });
            }
            progress
        })
        .collect()
}

fn bench_collect_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_stats");

    for courses in [1usize, 8, 32, 128] {
        let records = learner_records(courses);
        group.throughput(Throughput::Elements(courses as u64));
        group.bench_with_input(BenchmarkId::from_parameter(courses), &records, |b, records| {
            b.iter(|| UserStats::collect(black_box(records)));
        });
    }

    group.finish();
}

fn bench_evaluate_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_catalog");
    let definitions = cacao_achievements();
    let evaluator = AchievementEvaluator::new((0..8).map(|c| format!("course-{c}")));

    for courses in [1usize, 8, 32] {
        let stats = UserStats::collect(&learner_records(courses));
        let unlocked = HashSet::new();
        group.throughput(Throughput::Elements(definitions.len() as u64));
        group.bench_with_input(BenchmarkId::new("fresh", courses), &stats, |b, stats| {
            b.iter(|| evaluator.evaluate(black_box(&definitions), black_box(stats), &unlocked));
        });
    }

    // 大部分成就已解锁时的过滤开销
    let stats = UserStats::collect(&learner_records(32));
    let unlocked: HashSet<String> = definitions.iter().take(12).map(|d| d.id.clone()).collect();
    group.bench_function("mostly_unlocked", |b| {
        b.iter(|| evaluator.evaluate(black_box(&definitions), black_box(&stats), &unlocked));
    });

    group.bench_function("progress_of_all", |b| {
        b.iter(|| {
            definitions
                .iter()
                .map(|d| evaluator.progress_of(d, black_box(&stats)).percent)
                .collect::<Vec<_>>()
        });
    });

    group.finish();
}

fn bench_decode_conditions(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_conditions");
    let payloads = [
        ("course_count", AchievementCategory::CourseCompletion, json!({ "target": 5 })),
        ("course_all", AchievementCategory::CourseCompletion, json!({ "target": "all" })),
        ("quiz_best", AchievementCategory::QuizScore, json!({ "minScore": 90 })),
        (
            "quiz_count",
            AchievementCategory::QuizScore,
            json!({ "target": 3, "minScore": 80 }),
        ),
        ("time_spent", AchievementCategory::TimeSpent, json!({ "targetMinutes": 180 })),
    ];

    for (name, category, payload) in payloads.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), payload, |b, payload| {
            b.iter(|| AchievementCondition::from_payload(*category, black_box(payload)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_collect_stats,
    bench_evaluate_catalog,
    bench_decode_conditions
);
criterion_main!(benches);

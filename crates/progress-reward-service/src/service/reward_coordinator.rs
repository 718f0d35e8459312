//! 奖励协调服务
//!
//! 编排课时完成到奖励发放的完整链路：
//!
//! 1. 写入学习进度，捕获课程完成边沿（唯一会让调用失败的步骤）
//! 2. 非边沿直接返回
//! 3. 颁发证书并标记 `certificate_earned`
//! 4. 聚合用户统计并评估成就
//! 5. 对新满足条件的成就做条件写入，重试不会重复报告
//! 6. 依次派发 CourseCompleted、CertificateIssued、AchievementUnlocked 事件
//!
//! 3 至 6 步相互隔离，失败只记录日志并在响应的 `stage_failures` 中报告，
//! 已提交的进度不会回滚。重复执行时靠唯一键保证幂等，
//! 缺失的奖励可以通过 `reconcile` 补发。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use agrilearn_shared::observability::metrics;

use crate::achievement::{AchievementEvaluator, UserStats};
use crate::catalog::AchievementCatalog;
use crate::error::{RewardError, Result};
use crate::models::{AchievementDefinition, AchievementMetadata, CourseProgress};
use crate::notification::{NotificationDispatcher, RewardEvent};
use crate::repository::{
    CertificateRepositoryTrait, CourseProgressRepositoryTrait, UserAchievementRepositoryTrait,
};
use crate::service::certificate_issuer::{CertificateContext, CertificateIssuer, IssuedCertificate};
use crate::service::dto::{
    AchievementUnlockResponse, CompleteLessonRequest, CompleteLessonResponse, ReconcileSummary,
    RecordQuizRequest, RecordQuizResponse, StageFailure, UnlockedAchievementDto,
};
use crate::service::progress_store::ProgressStore;

/// 链路阶段名称，用于日志、指标和 `stage_failures`
mod stage {
    pub const CERTIFICATE: &str = "certificate";
    pub const ACHIEVEMENTS: &str = "achievements";
    pub const NOTIFICATION: &str = "notification";
}

/// 记录一次被隔离的阶段失败
fn stage_failure(stage: &'static str, error: RewardError) -> StageFailure {
    metrics::record_stage_failure(stage);
    warn!(stage, error = %error, "奖励阶段执行失败，但不影响主流程");
    StageFailure::new(stage, error)
}

/// 成就阶段的执行结果
#[derive(Debug, Default)]
struct AchievementOutcome {
    unlocked: Vec<AchievementDefinition>,
    failures: Vec<StageFailure>,
}

/// 奖励协调服务
pub struct RewardCoordinator<PR, AR, CR>
where
    PR: CourseProgressRepositoryTrait,
    AR: UserAchievementRepositoryTrait,
    CR: CertificateRepositoryTrait,
{
    progress: Arc<ProgressStore<PR>>,
    certificates: Arc<CertificateIssuer<CR>>,
    achievement_repo: Arc<AR>,
    achievement_catalog: Arc<dyn AchievementCatalog>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl<PR, AR, CR> RewardCoordinator<PR, AR, CR>
where
    PR: CourseProgressRepositoryTrait,
    AR: UserAchievementRepositoryTrait,
    CR: CertificateRepositoryTrait,
{
    pub fn new(
        progress: Arc<ProgressStore<PR>>,
        certificates: Arc<CertificateIssuer<CR>>,
        achievement_repo: Arc<AR>,
        achievement_catalog: Arc<dyn AchievementCatalog>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            progress,
            certificates,
            achievement_repo,
            achievement_catalog,
            dispatcher,
        }
    }

    /// 课时完成入口
    #[instrument(skip(self, request), fields(user_id = %request.user_id, course_id = %request.course_id, lesson_id = %request.lesson_id))]
    pub async fn complete_lesson(
        &self,
        request: CompleteLessonRequest,
    ) -> Result<CompleteLessonResponse> {
        let started = Instant::now();
        let now = Utc::now();

        let update = self.progress.apply_lesson_completion(&request, now).await?;
        metrics::record_lesson_completion(&request.course_id, update.applied.lesson_added);

        let progress = update.progress;
        let mut response = CompleteLessonResponse {
            overall_progress: progress.overall_progress,
            is_completed: progress.is_completed,
            completed_lessons: progress.completed_lesson_count() as u32,
            total_lessons: self.progress.total_lessons(&request.course_id),
            ..Default::default()
        };

        if !update.applied.completion_edge {
            metrics::record_pipeline_duration("complete_lesson", started.elapsed().as_secs_f64());
            return Ok(response);
        }

        response.course_just_completed = true;
        metrics::record_course_completion(&progress.course_id, "lesson");
        info!(
            completed_lessons = response.completed_lessons,
            total_lessons = response.total_lessons,
            "课程完成，开始发放奖励"
        );

        let mut events = vec![self.course_completed_event(&progress)];
        let mut failures = Vec::new();

        match self.issue_certificate(&progress, now).await {
            Ok(issued) => {
                response.certificate_id = Some(issued.certificate.certificate_id.clone());
                if issued.newly_issued {
                    response.certificate_issued = true;
                    events.push(self.certificate_event(&issued));
                }
            }
            Err(e) => failures.push(stage_failure(stage::CERTIFICATE, e)),
        }

        let achievements = self.achievement_stage(&request.user_id, now).await;
        response.new_achievements =
            self.collect_unlocked(&request.user_id, &achievements.unlocked, &mut events, now);
        failures.extend(achievements.failures);

        failures.extend(self.dispatch_events(&events).await);
        response.stage_failures = failures;

        metrics::record_pipeline_duration("complete_lesson", started.elapsed().as_secs_f64());
        info!(
            certificate_issued = response.certificate_issued,
            new_achievements = response.new_achievements.len(),
            stage_failures = response.stage_failures.len(),
            "课程完成奖励发放结束"
        );
        Ok(response)
    }

    /// 记录测验结果并评估成就
    #[instrument(skip(self, request), fields(user_id = %request.user_id, course_id = %request.course_id))]
    pub async fn record_quiz_result(&self, request: RecordQuizRequest) -> Result<RecordQuizResponse> {
        let started = Instant::now();
        let now = Utc::now();

        let progress = self.progress.record_quiz_result(&request, now).await?;

        let achievements = self.achievement_stage(&request.user_id, now).await;
        let mut events = Vec::new();
        let new_achievements =
            self.collect_unlocked(&request.user_id, &achievements.unlocked, &mut events, now);
        let mut failures = achievements.failures;
        failures.extend(self.dispatch_events(&events).await);

        metrics::record_pipeline_duration("record_quiz_result", started.elapsed().as_secs_f64());
        Ok(RecordQuizResponse {
            average_score: progress.average_score,
            total_quizzes: progress.quiz_results.len() as u32,
            new_achievements,
            stage_failures: failures,
        })
    }

    /// 重新计算用户全部课程进度
    ///
    /// 同时补发缺失的证书和成就，返回修正后的进度记录
    pub async fn recalculate_progress(&self, user_id: &str) -> Result<Vec<CourseProgress>> {
        self.reconcile(user_id).await.map(|summary| summary.progress)
    }

    /// 对账：修正进度、补发证书、补解锁成就
    ///
    /// 只为本次新建的奖励派发事件，多次执行结果一致
    #[instrument(skip(self))]
    pub async fn reconcile(&self, user_id: &str) -> Result<ReconcileSummary> {
        let started = Instant::now();
        let now = Utc::now();

        let results = self.progress.recalculate(user_id, now).await?;

        let mut summary = ReconcileSummary::default();
        let mut events = Vec::new();
        let mut failures = Vec::new();

        for (mut progress, outcome) in results {
            if outcome.changed {
                summary.corrected_records += 1;
            }
            if outcome.completion_edge {
                metrics::record_course_completion(&progress.course_id, "recalculation");
                events.push(self.course_completed_event(&progress));
            }

            if progress.is_completed && !progress.certificate_earned {
                match self.issue_certificate(&progress, now).await {
                    Ok(issued) => {
                        progress.certificate_earned = true;
                        if issued.newly_issued {
                            summary
                                .certificates_issued
                                .push(issued.certificate.certificate_id.clone());
                            events.push(self.certificate_event(&issued));
                        }
                    }
                    Err(e) => failures.push(stage_failure(stage::CERTIFICATE, e)),
                }
            }
            summary.progress.push(progress);
        }

        let achievements = self.achievement_stage(user_id, now).await;
        summary.new_achievements =
            self.collect_unlocked(user_id, &achievements.unlocked, &mut events, now);
        failures.extend(achievements.failures);
        failures.extend(self.dispatch_events(&events).await);
        summary.stage_failures = failures;

        metrics::record_pipeline_duration("reconcile", started.elapsed().as_secs_f64());
        info!(
            corrected_records = summary.corrected_records,
            certificates_issued = summary.certificates_issued.len(),
            new_achievements = summary.new_achievements.len(),
            "用户奖励对账完成"
        );
        Ok(summary)
    }

    /// 重新评估用户成就，返回本次新解锁的成就
    ///
    /// 单个成就写入失败和通知失败在 `stage_failures` 中报告，下次评估时重试
    #[instrument(skip(self))]
    pub async fn evaluate_achievements(&self, user_id: &str) -> Result<AchievementUnlockResponse> {
        if user_id.trim().is_empty() {
            return Err(RewardError::Validation("user_id 不能为空".to_string()));
        }
        let now = Utc::now();

        let outcome = self.unlock_qualified(user_id, now).await?;

        let mut events = Vec::new();
        let new_achievements = self.collect_unlocked(user_id, &outcome.unlocked, &mut events, now);
        let mut failures = outcome.failures;
        failures.extend(self.dispatch_events(&events).await);
        Ok(AchievementUnlockResponse {
            new_achievements,
            stage_failures: failures,
        })
    }

    /// 手动授予成就
    ///
    /// 社交和特殊类成就直接授予；其余类别先按用户统计复核，不满足条件时拒绝。
    /// 未启用的成就不能授予，已解锁时 `new_achievements` 为空。
    #[instrument(skip(self))]
    pub async fn unlock_manual(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<AchievementUnlockResponse> {
        if user_id.trim().is_empty() {
            return Err(RewardError::Validation("user_id 不能为空".to_string()));
        }
        let definition = self
            .achievement_catalog
            .get(achievement_id)
            .await?
            .ok_or_else(|| RewardError::not_found("achievement", achievement_id))?;
        if !definition.is_active {
            return Err(RewardError::Validation(format!(
                "成就 {} 未启用",
                achievement_id
            )));
        }

        let metadata = if definition.category().is_manual_only() {
            AchievementMetadata {
                current_value: 1,
                target_value: 1,
            }
        } else {
            let records = self.progress.list_for_user(user_id).await?;
            let stats = UserStats::collect(&records);
            let evaluator = self.evaluator();
            if !evaluator.qualifies(&definition.condition, &stats) {
                return Err(RewardError::Validation(format!(
                    "用户 {} 未满足成就 {} 的条件",
                    user_id, achievement_id
                )));
            }
            evaluator.progress_of(&definition, &stats).metadata()
        };

        let now = Utc::now();
        if !self
            .achievement_repo
            .unlock(user_id, &definition.id, metadata, now)
            .await?
        {
            info!("成就已解锁，忽略手动授予");
            return Ok(AchievementUnlockResponse::default());
        }

        metrics::record_achievement_unlocked(
            definition.category().as_str(),
            definition.rarity.as_str(),
        );
        info!(points = definition.points, "成就已手动授予");

        let mut events = Vec::new();
        let new_achievements =
            self.collect_unlocked(user_id, std::slice::from_ref(&definition), &mut events, now);
        let stage_failures = self.dispatch_events(&events).await;
        Ok(AchievementUnlockResponse {
            new_achievements,
            stage_failures,
        })
    }

    fn evaluator(&self) -> AchievementEvaluator {
        AchievementEvaluator::new(self.progress.catalog().course_ids())
    }

    fn course_completed_event(&self, progress: &CourseProgress) -> RewardEvent {
        RewardEvent::CourseCompleted {
            user_id: progress.user_id.clone(),
            course_id: progress.course_id.clone(),
            course_title: self.progress.course_title(&progress.course_id),
            score: progress.final_score(),
            completed_at: progress.completed_at.unwrap_or(progress.last_accessed_at),
        }
    }

    fn certificate_event(&self, issued: &IssuedCertificate) -> RewardEvent {
        let certificate = &issued.certificate;
        RewardEvent::CertificateIssued {
            user_id: certificate.user_id.clone(),
            course_id: certificate.course_id.clone(),
            course_title: certificate.course_title.clone(),
            certificate_id: certificate.certificate_id.clone(),
        }
    }

    /// 把新解锁的成就转换为事件和响应 DTO
    fn collect_unlocked(
        &self,
        user_id: &str,
        unlocked: &[AchievementDefinition],
        events: &mut Vec<RewardEvent>,
        now: DateTime<Utc>,
    ) -> Vec<UnlockedAchievementDto> {
        unlocked
            .iter()
            .map(|definition| {
                events.push(RewardEvent::AchievementUnlocked {
                    user_id: user_id.to_string(),
                    achievement_id: definition.id.clone(),
                    name: definition.name.clone(),
                    description: definition.description.clone(),
                    points: definition.points,
                    rarity: definition.rarity,
                });
                UnlockedAchievementDto::from_definition(definition, now)
            })
            .collect()
    }

    /// 颁发证书并标记进度记录
    async fn issue_certificate(
        &self,
        progress: &CourseProgress,
        now: DateTime<Utc>,
    ) -> Result<IssuedCertificate> {
        let context = CertificateContext {
            course_title: self.progress.course_title(&progress.course_id),
            total_lessons: self.progress.total_lessons(&progress.course_id),
        };
        let issued = self.certificates.issue(progress, &context, now).await?;
        // 标记失败时证书仍然有效，下次对账会重新标记
        if let Err(e) = self
            .progress
            .mark_certificate_earned(&progress.user_id, &progress.course_id)
            .await
        {
            warn!(error = %e, "标记 certificate_earned 失败，但不影响主流程");
        }
        Ok(issued)
    }

    /// 成就阶段，加载失败时整体记为一次阶段失败
    async fn achievement_stage(&self, user_id: &str, now: DateTime<Utc>) -> AchievementOutcome {
        match self.unlock_qualified(user_id, now).await {
            Ok(outcome) => outcome,
            Err(e) => AchievementOutcome {
                unlocked: Vec::new(),
                failures: vec![stage_failure(stage::ACHIEVEMENTS, e)],
            },
        }
    }

    /// 评估并解锁新满足条件的成就，同时刷新未完成成就的进度快照
    async fn unlock_qualified(&self, user_id: &str, now: DateTime<Utc>) -> Result<AchievementOutcome> {
        let records = self.progress.list_for_user(user_id).await?;
        let stats = UserStats::collect(&records);
        let definitions = self.achievement_catalog.list_active().await?;
        let already_unlocked: HashSet<String> = self
            .achievement_repo
            .list_by_user(user_id)
            .await?
            .into_iter()
            .filter(|a| a.is_completed)
            .map(|a| a.achievement_id)
            .collect();

        let evaluator = self.evaluator();
        let qualified = evaluator.evaluate(&definitions, &stats, &already_unlocked);
        let qualified_ids: HashSet<&str> = qualified.iter().map(|d| d.id.as_str()).collect();

        let mut outcome = AchievementOutcome::default();
        for definition in &qualified {
            let metadata = evaluator.progress_of(definition, &stats).metadata();
            match self
                .achievement_repo
                .unlock(user_id, &definition.id, metadata, now)
                .await
            {
                Ok(true) => {
                    metrics::record_achievement_unlocked(
                        definition.category().as_str(),
                        definition.rarity.as_str(),
                    );
                    info!(
                        user_id,
                        achievement_id = %definition.id,
                        points = definition.points,
                        "成就解锁"
                    );
                    outcome.unlocked.push(definition.clone());
                }
                // 并发请求已解锁，不重复报告
                Ok(false) => {}
                Err(e) => outcome
                    .failures
                    .push(stage_failure(stage::ACHIEVEMENTS, e)),
            }
        }

        for definition in definitions.iter().filter(|d| {
            !d.category().is_manual_only()
                && !already_unlocked.contains(&d.id)
                && !qualified_ids.contains(d.id.as_str())
        }) {
            let progress = evaluator.progress_of(definition, &stats);
            if let Err(e) = self
                .achievement_repo
                .record_progress(user_id, &definition.id, progress.percent, progress.metadata())
                .await
            {
                warn!(
                    achievement_id = %definition.id,
                    error = %e,
                    "成就进度快照写入失败，但不影响主流程"
                );
            }
        }

        Ok(outcome)
    }

    /// 按顺序派发事件，单个事件失败不影响后续事件
    async fn dispatch_events(&self, events: &[RewardEvent]) -> Vec<StageFailure> {
        let mut failures = Vec::new();
        for event in events {
            if let Err(e) = self.dispatcher.dispatch(event).await {
                failures.push(stage_failure(stage::NOTIFICATION, e));
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockAchievementCatalog, StaticAchievementCatalog, StaticCourseCatalog};
    use crate::config::RewardConfig;
    use crate::notification::MockNotificationDispatcher;
    use crate::models::{AchievementCondition, Rarity};
    use crate::repository::{
        MemoryCertificateRepository, MemoryCourseProgressRepository,
        MemoryUserAchievementRepository, MockCertificateRepositoryTrait,
        MockUserAchievementRepositoryTrait,
    };

    const GAP_LESSONS: [&str; 3] = ["gap-principles", "benefits-gap", "regulatory-framework"];

    fn coordinator<CR: CertificateRepositoryTrait>(
        certificate_repo: CR,
        achievement_catalog: Arc<dyn AchievementCatalog>,
        dispatcher: MockNotificationDispatcher,
    ) -> RewardCoordinator<MemoryCourseProgressRepository, MemoryUserAchievementRepository, CR> {
        coordinator_with(
            MemoryUserAchievementRepository::new(),
            certificate_repo,
            achievement_catalog,
            dispatcher,
        )
    }

    fn coordinator_with<AR, CR>(
        achievement_repo: AR,
        certificate_repo: CR,
        achievement_catalog: Arc<dyn AchievementCatalog>,
        dispatcher: MockNotificationDispatcher,
    ) -> RewardCoordinator<MemoryCourseProgressRepository, AR, CR>
    where
        AR: UserAchievementRepositoryTrait,
        CR: CertificateRepositoryTrait,
    {
        let config = RewardConfig::default();
        let store = Arc::new(ProgressStore::new(
            Arc::new(MemoryCourseProgressRepository::new()),
            Arc::new(StaticCourseCatalog::cacao(config.default_lesson_count).unwrap()),
            config.default_lesson_minutes,
        ));
        RewardCoordinator::new(
            store,
            Arc::new(CertificateIssuer::new(Arc::new(certificate_repo), config)),
            Arc::new(achievement_repo),
            achievement_catalog,
            Arc::new(dispatcher),
        )
    }

    fn social_achievement(is_active: bool) -> AchievementDefinition {
        AchievementDefinition {
            id: "community-helper".to_string(),
            name: "Community Helper".to_string(),
            description: "Answer a question in the forum".to_string(),
            points: 20,
            rarity: Rarity::Common,
            sort_order: 1,
            is_active,
            condition: AchievementCondition::Social,
        }
    }

    fn quiz(score: u32) -> RecordQuizRequest {
        RecordQuizRequest {
            user_id: "u1".to_string(),
            course_id: "cacao-basics".to_string(),
            lesson_id: "intro-cacao".to_string(),
            score,
            total_questions: 20,
            correct_answers: score / 5,
        }
    }

    fn lesson(lesson_id: &str) -> CompleteLessonRequest {
        CompleteLessonRequest::new("u1", "gap-practices", lesson_id, lesson_id)
    }

    #[tokio::test]
    async fn test_non_edge_lesson_has_no_side_effects() {
        let mut catalog = MockAchievementCatalog::new();
        catalog.expect_list_active().never();
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher.expect_dispatch().never();

        let svc = coordinator(MemoryCertificateRepository::new(), Arc::new(catalog), dispatcher);
        let response = svc.complete_lesson(lesson(GAP_LESSONS[0])).await.unwrap();

        assert_eq!(response.overall_progress, 33);
        assert_eq!(response.completed_lessons, 1);
        assert_eq!(response.total_lessons, 3);
        assert!(!response.course_just_completed);
        assert!(response.stage_failures.is_empty());
    }

    #[tokio::test]
    async fn test_certificate_failure_does_not_block_achievements() {
        let mut certificate_repo = MockCertificateRepositoryTrait::new();
        certificate_repo
            .expect_find()
            .returning(|_, _| Err(RewardError::Internal("certificate store offline".into())));
        certificate_repo.expect_insert().never();

        // CourseCompleted + First Steps，没有证书事件
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher
            .expect_dispatch()
            .withf(|event| !matches!(event, RewardEvent::CertificateIssued { .. }))
            .times(2)
            .returning(|_| Ok(()));

        let svc = coordinator(
            certificate_repo,
            Arc::new(StaticAchievementCatalog::cacao()),
            dispatcher,
        );
        for id in &GAP_LESSONS[..2] {
            svc.complete_lesson(lesson(id)).await.unwrap();
        }
        let response = svc.complete_lesson(lesson(GAP_LESSONS[2])).await.unwrap();

        assert!(response.course_just_completed);
        assert!(!response.certificate_issued);
        assert!(response.certificate_id.is_none());
        assert_eq!(response.stage_failures.len(), 1);
        assert_eq!(response.stage_failures[0].stage, stage::CERTIFICATE);
        assert_eq!(response.new_achievements.len(), 1);
        assert_eq!(response.new_achievements[0].achievement_id, "first-steps");
    }

    #[tokio::test]
    async fn test_record_quiz_runs_achievement_stage() {
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher
            .expect_dispatch()
            .withf(|event| {
                matches!(event, RewardEvent::AchievementUnlocked { achievement_id, .. }
                    if achievement_id == "perfectionist")
            })
            .times(1)
            .returning(|_| Ok(()));

        let svc = coordinator(
            MemoryCertificateRepository::new(),
            Arc::new(StaticAchievementCatalog::cacao()),
            dispatcher,
        );
        let response = svc.record_quiz_result(quiz(95)).await.unwrap();

        assert_eq!(response.average_score, 95);
        assert_eq!(response.total_quizzes, 1);
        let ids: Vec<&str> = response
            .new_achievements
            .iter()
            .map(|a| a.achievement_id.as_str())
            .collect();
        assert_eq!(ids, vec!["perfectionist"]);
    }

    #[tokio::test]
    async fn test_unlock_manual_unknown_achievement() {
        let mut catalog = MockAchievementCatalog::new();
        catalog.expect_get().returning(|_| Ok(None));
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher.expect_dispatch().never();

        let svc = coordinator(MemoryCertificateRepository::new(), Arc::new(catalog), dispatcher);
        let err = svc.unlock_manual("u1", "ghost").await.unwrap_err();
        assert!(matches!(err, RewardError::NotFound { entity: "achievement", .. }));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_blank_user() {
        let svc = coordinator(
            MemoryCertificateRepository::new(),
            Arc::new(StaticAchievementCatalog::cacao()),
            MockNotificationDispatcher::new(),
        );
        let err = svc.evaluate_achievements("  ").await.unwrap_err();
        assert!(matches!(err, RewardError::Validation(_)));
    }

    #[tokio::test]
    async fn test_evaluate_reports_failed_unlock() {
        let mut achievement_repo = MockUserAchievementRepositoryTrait::new();
        achievement_repo.expect_list_by_user().returning(|_| Ok(Vec::new()));
        achievement_repo
            .expect_record_progress()
            .returning(|_, _, _, _| Ok(()));
        achievement_repo
            .expect_unlock()
            .returning(|_, _, _, _| Err(RewardError::Internal("db down".into())));
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher.expect_dispatch().never();

        let svc = coordinator_with(
            achievement_repo,
            MemoryCertificateRepository::new(),
            Arc::new(StaticAchievementCatalog::cacao()),
            dispatcher,
        );
        // 测验本身已提交，成就写入失败在响应中报告
        let quiz_response = svc.record_quiz_result(quiz(95)).await.unwrap();
        assert!(quiz_response.new_achievements.is_empty());
        assert_eq!(quiz_response.stage_failures.len(), 1);

        let response = svc.evaluate_achievements("u1").await.unwrap();
        assert!(response.new_achievements.is_empty());
        assert_eq!(response.stage_failures.len(), 1);
        assert_eq!(response.stage_failures[0].stage, stage::ACHIEVEMENTS);
        assert!(response.stage_failures[0].message.contains("db down"));
    }

    #[tokio::test]
    async fn test_unlock_manual_reports_notification_failure() {
        let mut catalog = MockAchievementCatalog::new();
        catalog
            .expect_get()
            .returning(|_| Ok(Some(social_achievement(true))));
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher
            .expect_dispatch()
            .times(1)
            .returning(|_| Err(RewardError::Internal("mailer offline".into())));

        let svc = coordinator(MemoryCertificateRepository::new(), Arc::new(catalog), dispatcher);
        let response = svc.unlock_manual("u1", "community-helper").await.unwrap();

        assert_eq!(response.new_achievements.len(), 1);
        assert_eq!(response.new_achievements[0].points, 20);
        assert_eq!(response.stage_failures.len(), 1);
        assert_eq!(response.stage_failures[0].stage, stage::NOTIFICATION);
    }

    #[tokio::test]
    async fn test_unlock_manual_rejects_inactive_achievement() {
        let mut catalog = MockAchievementCatalog::new();
        catalog
            .expect_get()
            .returning(|_| Ok(Some(social_achievement(false))));
        let mut achievement_repo = MockUserAchievementRepositoryTrait::new();
        achievement_repo.expect_unlock().never();
        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher.expect_dispatch().never();

        let svc = coordinator_with(
            achievement_repo,
            MemoryCertificateRepository::new(),
            Arc::new(catalog),
            dispatcher,
        );
        let err = svc.unlock_manual("u1", "community-helper").await.unwrap_err();
        assert!(matches!(err, RewardError::Validation(_)));
    }
}

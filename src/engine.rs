//! 매치 엔진 오케스트레이터 -- 스캔/조회 진입점과 생명주기
//!
//! [`MatchEngine`]은 외부 스케줄러(스캔 트리거)와 표현 계층(조회)이 사용하는
//! 진입점입니다. 엔진 자체는 스케줄러를 내장하지 않으며, 주기 실행은
//! 외부 협력자의 몫입니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! package_references --+
//!                      +--> scan_matches --> vulnerability_matches
//! catalog (vap/vas) ---+                            |
//!                                                   +--> match_by_id / list_matches
//! ```
//!
//! # 취소
//!
//! 모든 작업은 shutdown 토큰과 경합합니다. 취소된 스캔은
//! [`VulnmatchError::Cancelled`]를 반환하고, 진행 중이던 트랜잭션은
//! 드롭되면서 완전히 롤백됩니다 (부분 결과 없음).

use std::sync::atomic::{AtomicU64, Ordering};

use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::config::MatchEngineConfig;
use crate::error::VulnmatchError;
use crate::store::MatchStore;
use crate::types::{MatchPage, ScanReport, VulnerabilityMatch};

/// 취약점 매치 엔진
///
/// 스토어를 감싸고 스캔 ID 부여, 구조화 로깅, 취소, 실행 카운터를 더합니다.
pub struct MatchEngine {
    /// 엔진 설정
    config: MatchEngineConfig,
    /// 매치 스토어
    store: MatchStore,
    /// 종료 토큰
    shutdown: CancellationToken,
    /// 완료된 스캔 수
    scans_completed: AtomicU64,
    /// 누적 삽입된 매치 수
    matches_inserted: AtomicU64,
}

impl MatchEngine {
    /// 엔진 설정 참조를 반환합니다.
    pub fn config(&self) -> &MatchEngineConfig {
        &self.config
    }

    /// 스토어 참조를 반환합니다.
    pub fn store(&self) -> &MatchStore {
        &self.store
    }

    /// 완료된 스캔 수를 반환합니다.
    pub fn scans_completed(&self) -> u64 {
        self.scans_completed.load(Ordering::Relaxed)
    }

    /// 누적 삽입된 매치 수를 반환합니다.
    pub fn matches_inserted(&self) -> u64 {
        self.matches_inserted.load(Ordering::Relaxed)
    }

    /// 진행 중/이후의 모든 작업을 취소합니다.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// 새 매치를 탐색하고 영속화합니다 (외부 스케줄러용 진입점).
    ///
    /// 실행마다 고유 `scan_id`가 로그 span에 부여됩니다.
    pub async fn scan_matches(&self) -> Result<ScanReport, VulnmatchError> {
        let scan_id = Uuid::new_v4();
        let span = tracing::info_span!("scan_matches", scan_id = %scan_id);

        async {
            let report = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(VulnmatchError::Cancelled),
                result = self.store.scan_matches() => result?,
            };

            self.scans_completed.fetch_add(1, Ordering::Relaxed);
            self.matches_inserted
                .fetch_add(report.inserted, Ordering::Relaxed);

            info!(
                candidates = report.candidates,
                matched = report.matched,
                invalid_versions = report.invalid_versions,
                inserted = report.inserted,
                "scan complete"
            );

            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// ID로 매치 하나를 조회합니다 (표현 계층용 진입점).
    pub async fn match_by_id(
        &self,
        id: i64,
    ) -> Result<Option<VulnerabilityMatch>, VulnmatchError> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(VulnmatchError::Cancelled),
            result = self.store.match_by_id(id) => result,
        }
    }

    /// 매치 페이지를 조회합니다 (표현 계층용 진입점).
    pub async fn list_matches(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<MatchPage, VulnmatchError> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(VulnmatchError::Cancelled),
            result = self.store.list_matches(limit, offset) => result,
        }
    }
}

/// [`MatchEngine`] 빌더
///
/// 풀을 직접 주입하거나 (테스트, 공유 풀), 설정의 URL로 연결합니다.
/// `build()`는 스키마 마이그레이션까지 수행합니다.
#[derive(Default)]
pub struct MatchEngineBuilder {
    config: Option<MatchEngineConfig>,
    pool: Option<SqlitePool>,
}

impl MatchEngineBuilder {
    /// 빈 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔진 설정을 지정합니다. 생략하면 기본값을 사용합니다.
    pub fn config(mut self, config: MatchEngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 기존 커넥션 풀을 주입합니다.
    pub fn pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 엔진을 생성합니다.
    ///
    /// 설정 검증 → 스토어 연결(또는 주입된 풀 사용) → 스키마 보장 순서입니다.
    pub async fn build(self) -> Result<MatchEngine, VulnmatchError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = match self.pool {
            Some(pool) => MatchStore::new(pool, &config),
            None => MatchStore::connect(&config).await?,
        };
        store.migrate().await?;

        Ok(MatchEngine {
            config,
            store,
            shutdown: CancellationToken::new(),
            scans_completed: AtomicU64::new(0),
            matches_inserted: AtomicU64::new(0),
        })
    }
}

//! 매치 엔진 설정
//!
//! [`MatchEngineConfig`]는 스토어 연결과 쿼리 한도, scheme 매핑 확장을 담습니다.
//!
//! # 사용 예시
//!
//! ```
//! use vulnmatch::MatchEngineConfig;
//!
//! // 기본값으로 생성
//! let config = MatchEngineConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use vulnmatch::MatchEngineConfigBuilder;
//!
//! let config = MatchEngineConfigBuilder::new()
//!     .database_url("sqlite::memory:")
//!     .max_connections(1)
//!     .build()
//!     .unwrap();
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::VulnmatchError;
use crate::scheme::SchemeMapping;

/// 매치 엔진 설정
///
/// # 필드
///
/// - **database_url**: 스토어 연결 URL
/// - **max_connections**: 커넥션 풀 최대 크기
/// - **page_size_limit**: `list_matches`의 limit 인자 상한
/// - **scheme_languages**: 기본 scheme 매핑에 추가/덮어쓸 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchEngineConfig {
    /// 스토어 연결 URL
    pub database_url: String,
    /// 커넥션 풀 최대 크기
    pub max_connections: u32,
    /// `list_matches`의 limit 인자 상한
    pub page_size_limit: i64,
    /// scheme → 언어 레이블 추가 매핑 (기본 테이블에 병합됨)
    pub scheme_languages: BTreeMap<String, String>,
}

impl Default for MatchEngineConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:vulnmatch.db".to_owned(),
            max_connections: 5,
            page_size_limit: 100,
            scheme_languages: BTreeMap::new(),
        }
    }
}

/// 설정 상한값 상수
const MAX_CONNECTIONS_LIMIT: u32 = 64;
const MAX_PAGE_SIZE_LIMIT: i64 = 10_000;

impl MatchEngineConfig {
    /// TOML 문자열에서 설정을 파싱합니다.
    ///
    /// 누락된 필드는 기본값으로 채워집니다.
    pub fn parse(toml_str: &str) -> Result<Self, VulnmatchError> {
        toml::from_str(toml_str).map_err(|e| VulnmatchError::Config {
            field: "(toml)".to_owned(),
            reason: e.to_string(),
        })
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `database_url`: 비어있으면 안 됨
    /// - `max_connections`: 1-64
    /// - `page_size_limit`: 1-10000
    /// - `scheme_languages`: 키와 값이 비어있으면 안 됨
    pub fn validate(&self) -> Result<(), VulnmatchError> {
        if self.database_url.is_empty() {
            return Err(VulnmatchError::Config {
                field: "database_url".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.max_connections == 0 || self.max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(VulnmatchError::Config {
                field: "max_connections".to_owned(),
                reason: format!("must be 1-{MAX_CONNECTIONS_LIMIT}"),
            });
        }

        if self.page_size_limit <= 0 || self.page_size_limit > MAX_PAGE_SIZE_LIMIT {
            return Err(VulnmatchError::Config {
                field: "page_size_limit".to_owned(),
                reason: format!("must be 1-{MAX_PAGE_SIZE_LIMIT}"),
            });
        }

        for (scheme, language) in &self.scheme_languages {
            if scheme.is_empty() || language.is_empty() {
                return Err(VulnmatchError::Config {
                    field: "scheme_languages".to_owned(),
                    reason: "scheme and language must not be empty".to_owned(),
                });
            }
        }

        Ok(())
    }

    /// 기본 scheme 매핑 테이블에 설정 항목을 병합하여 반환합니다.
    pub fn scheme_mapping(&self) -> SchemeMapping {
        let mut mapping = SchemeMapping::default();
        for (scheme, language) in &self.scheme_languages {
            mapping.insert(scheme.clone(), language.clone());
        }
        mapping
    }
}

/// [`MatchEngineConfig`] 빌더
#[derive(Debug, Default)]
pub struct MatchEngineConfigBuilder {
    config: MatchEngineConfig,
}

impl MatchEngineConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 스토어 연결 URL을 설정합니다.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    /// 커넥션 풀 최대 크기를 설정합니다.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.max_connections = n;
        self
    }

    /// `list_matches`의 limit 상한을 설정합니다.
    pub fn page_size_limit(mut self, n: i64) -> Self {
        self.config.page_size_limit = n;
        self
    }

    /// scheme 매핑 항목을 추가합니다.
    pub fn scheme_language(
        mut self,
        scheme: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        self.config
            .scheme_languages
            .insert(scheme.into(), language.into());
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<MatchEngineConfig, VulnmatchError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//! 매치 엔진 에러 타입
//!
//! [`VulnmatchError`]는 매치 엔진 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! 스캔 중 파싱 불가능한 버전 문자열은 에러가 아니라 진단 로그 대상이며,
//! 해당 후보만 제외됩니다 ([`crate::version::satisfies`] 참고).
//!
//! # 에러 카테고리
//!
//! - **설정**: `Config`
//! - **스토어 접근**: `Store` (연결, 트랜잭션, 쿼리 실행 실패)
//! - **행 디코딩**: `Decode` (JSON 리스트 컬럼 파싱 실패)
//! - **쿼리 인자**: `Query` (잘못된 페이지네이션 인자)
//! - **취소**: `Cancelled`

/// 매치 엔진 도메인 에러
///
/// 스토어 연결/트랜잭션 실패는 현재 작업에 치명적이며 그대로 전파됩니다.
/// 진행 중이던 스캔 트랜잭션은 커밋되지 않은 채 롤백됩니다.
#[derive(Debug, thiserror::Error)]
pub enum VulnmatchError {
    /// 유효하지 않은 설정 값
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 스토어 작업 실패 (연결, 트랜잭션, 쿼리 실행)
    #[error("store error: {operation}: {source}")]
    Store {
        /// 실패한 작업명
        operation: String,
        /// 원본 sqlx 에러
        source: sqlx::Error,
    },

    /// 행 디코딩 실패 (리스트 컬럼의 JSON이 손상됨)
    #[error("decode error: column '{column}': {reason}")]
    Decode {
        /// 디코딩 대상 컬럼명
        column: String,
        /// 실패 사유
        reason: String,
    },

    /// 잘못된 쿼리 인자
    #[error("query error: {reason}")]
    Query {
        /// 에러 사유
        reason: String,
    },

    /// 작업이 취소됨
    #[error("operation cancelled")]
    Cancelled,
}

impl VulnmatchError {
    /// 스토어 에러를 작업명과 함께 래핑합니다.
    pub(crate) fn store(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Store {
            operation: operation.into(),
            source,
        }
    }

    /// JSON 리스트 컬럼 디코딩 에러를 래핑합니다.
    pub(crate) fn decode(column: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            column: column.into(),
            reason: source.to_string(),
        }
    }
}

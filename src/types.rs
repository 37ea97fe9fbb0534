//! 도메인 타입 -- 패키지 참조, 취약점 카탈로그, 매치
//!
//! 외부 협력자가 소유하는 읽기 전용 입력(패키지 참조, 취약점 카탈로그)과
//! 이 엔진이 소유하는 [`VulnerabilityMatch`]를 정의합니다.
//!
//! # 소유권
//!
//! - [`PackageReference`]: 업로드 추출 파이프라인이 생산 (읽기 전용 입력)
//! - [`AffectedPackage`], [`AffectedSymbol`]: 취약점 카탈로그 수집기가 생산 (읽기 전용 입력)
//! - [`VulnerabilityMatch`]: 스캔 엔진이 생성, 쿼리 계층이 재구성 (append-only)

use serde::{Deserialize, Serialize};

/// 업로드된 아티팩트의 패키지 의존성 참조
///
/// 하나의 업로드는 여러 참조를 가질 수 있습니다.
/// `scheme`은 생태계 식별자이며 ([`crate::scheme::SchemeMapping`] 참고),
/// 매핑되지 않은 scheme의 참조는 스캔에서 의도적으로 제외됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    /// 업로드 ID
    pub upload_id: i64,
    /// 패키지 이름 (예: `github.com/foo/bar`)
    pub package_name: String,
    /// 패키지 버전 문자열
    pub version: String,
    /// 생태계 scheme (예: `gomod`, `npm`)
    pub scheme: String,
}

/// 취약점이 영향을 미치는 패키지 버전 범위
///
/// `version_constraint`는 범위 표현식 목록이며 논리곱(AND)으로 해석됩니다.
/// 버전은 모든 표현식을 만족해야 영향 범위에 포함됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedPackage {
    /// 카탈로그 행 ID
    pub id: i64,
    /// 소속 취약점 ID
    pub vulnerability_id: i64,
    /// 영향받는 패키지명
    pub package_name: String,
    /// 생태계 언어 레이블 (예: `go`, `Javascript`)
    pub language: String,
    /// 패키지 네임스페이스
    pub namespace: String,
    /// 영향 버전 범위 표현식 목록 (AND)
    pub version_constraint: Vec<String>,
    /// 수정 여부
    pub fixed: bool,
    /// 수정된 버전. 카탈로그의 빈 문자열은 항상 `None`으로 정규화됨
    pub fixed_in: Option<String>,
    /// 영향받는 심볼 목록
    pub affected_symbols: Vec<AffectedSymbol>,
}

/// 하나의 [`AffectedPackage`]에 속한 영향 심볼 집합
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedSymbol {
    /// 파일 경로
    pub path: String,
    /// 심볼 이름 목록
    pub symbols: Vec<String>,
}

/// 업로드와 취약점 영향 패키지 사이의 영속화된 매치
///
/// `(upload_id, affected_package.id)` 쌍은 매치 테이블에서 유일하며,
/// 스캔 엔진이 정확히 한 번 생성한 뒤 변경되지 않습니다.
///
/// `affected_package`는 쿼리 시 카탈로그와 조인하여 재구성됩니다.
/// 카탈로그 행이 사라진 경우(left join 미스) `None`이 될 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityMatch {
    /// 매치 행 ID
    pub id: i64,
    /// 업로드 ID
    pub upload_id: i64,
    /// 조인된 취약점 ID (패키지 미스 시 0)
    pub vulnerability_id: i64,
    /// 재구성된 영향 패키지
    pub affected_package: Option<AffectedPackage>,
}

/// 페이지네이션된 매치 조회 결과
///
/// `total_count`는 limit/offset과 무관한 전체 매치 수이며,
/// 호출자가 별도의 카운트 쿼리를 발행할 필요가 없습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPage {
    /// 조회된 매치 목록 (매치 ID 오름차순)
    pub matches: Vec<VulnerabilityMatch>,
    /// 전체 매치 수 (페이지 인자와 무관)
    pub total_count: i64,
}

/// 단일 스캔 실행 결과 요약
///
/// 스캔의 에러 계약과는 무관한 관측용 카운터입니다.
/// 입력이 변하지 않았다면 두 번째 실행의 `inserted`는 0입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// 이름/언어 조인으로 생성된 후보 수
    pub candidates: u64,
    /// 버전 제약을 만족한 후보 수
    pub matched: u64,
    /// 파싱 불가능한 버전/제약으로 제외된 후보 수
    pub invalid_versions: u64,
    /// 이번 실행에서 새로 영속화된 매치 수 (중복은 무시됨)
    pub inserted: u64,
}

//! 매치 조회 -- left join 평탄화 결과의 재구성과 페이지네이션
//!
//! 매치 하나는 심볼 fan-out 때문에 0개/1개/여러 개의 물리 행으로 조회됩니다.
//! [`fold_match_rows`]가 정렬된 행 스트림을 접어 논리 매치로 되돌립니다.
//!
//! 전체 매치 수는 페이지 선택과 같은 쿼리에서 윈도우 함수로 한 번 계산되어
//! 모든 행에 복사되므로, 호출자는 별도의 카운트 쿼리를 발행하지 않습니다.

use sqlx::Row;

use crate::error::VulnmatchError;
use crate::types::{AffectedPackage, AffectedSymbol, MatchPage, VulnerabilityMatch};

use super::MatchStore;

/// 매치 행의 공통 SELECT 필드
///
/// left join의 오른쪽(vap, vas)은 NULL일 수 있습니다.
const MATCH_FIELDS: &str = r"
    m.id AS id,
    m.upload_id AS upload_id,
    vap.vulnerability_id AS vulnerability_id,
    vap.id AS package_id,
    vap.package_name AS package_name,
    vap.language AS language,
    vap.namespace AS namespace,
    vap.version_constraint AS version_constraint,
    vap.fixed AS fixed,
    vap.fixed_in AS fixed_in,
    vas.path AS path,
    vas.symbols AS symbols
";

impl MatchStore {
    /// ID로 매치 하나를 조회합니다.
    ///
    /// 행이 없으면 `Ok(None)`입니다 (에러가 아님).
    pub async fn match_by_id(
        &self,
        id: i64,
    ) -> Result<Option<VulnerabilityMatch>, VulnmatchError> {
        let sql = format!(
            r"
            SELECT {MATCH_FIELDS}, 0 AS total_count
            FROM vulnerability_matches m
            LEFT JOIN vulnerability_affected_packages vap ON vap.id = m.affected_package_id
            LEFT JOIN vulnerability_affected_symbols vas ON vas.affected_package_id = vap.id
            WHERE m.id = ?
            ORDER BY vap.id, vas.id
            "
        );

        let rows = sqlx::query(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VulnmatchError::store("select match by id", e))?;

        let mut row_matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let (row_match, _) = decode_match_row(row)?;
            row_matches.push(row_match);
        }

        Ok(fold_match_rows(row_matches).into_iter().next())
    }

    /// 매치를 ID 오름차순으로 페이지 조회합니다.
    ///
    /// `total_count`는 limit/offset과 무관한 전체 매치 수입니다.
    ///
    /// # Errors
    ///
    /// limit이 0 이하이거나 설정의 `page_size_limit`을 넘으면,
    /// 또는 offset이 음수이면 [`VulnmatchError::Query`]를 반환합니다.
    pub async fn list_matches(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<MatchPage, VulnmatchError> {
        if limit <= 0 || limit > self.page_size_limit {
            return Err(VulnmatchError::Query {
                reason: format!("limit must be 1-{}", self.page_size_limit),
            });
        }
        if offset < 0 {
            return Err(VulnmatchError::Query {
                reason: "offset must not be negative".to_owned(),
            });
        }

        // 페이지는 매치 ID로 먼저 선택되고, 전체 수는 limit 적용 전에
        // 윈도우 함수로 한 번 계산되어 모든 행에 복사된다.
        let sql = format!(
            r"
            WITH limited_matches AS (
                SELECT
                    m.id,
                    m.upload_id,
                    m.affected_package_id,
                    COUNT(*) OVER () AS total_count
                FROM vulnerability_matches m
                ORDER BY m.id
                LIMIT ? OFFSET ?
            )
            SELECT {MATCH_FIELDS}, m.total_count AS total_count
            FROM limited_matches m
            LEFT JOIN vulnerability_affected_packages vap ON vap.id = m.affected_package_id
            LEFT JOIN vulnerability_affected_symbols vas ON vas.affected_package_id = vap.id
            ORDER BY m.id, vap.id, vas.id
            "
        );

        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VulnmatchError::store("select matches", e))?;

        let mut total_count = 0;
        let mut row_matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let (row_match, count) = decode_match_row(row)?;
            total_count = count;
            row_matches.push(row_match);
        }

        Ok(MatchPage {
            matches: fold_match_rows(row_matches),
            total_count,
        })
    }
}

/// 물리 행 하나를 매치(심볼 최대 1개 포함)와 total_count로 디코딩합니다.
///
/// left join 미스(NULL 패키지/심볼)는 빈 구조체로 병합하지 않고 건너뜁니다.
/// 카탈로그의 빈 `fixed_in` 문자열은 `None`으로 정규화됩니다.
fn decode_match_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(VulnerabilityMatch, i64), VulnmatchError> {
    let get_err = |e| VulnmatchError::store("decode match row", e);

    let id: i64 = row.try_get("id").map_err(get_err)?;
    let upload_id: i64 = row.try_get("upload_id").map_err(get_err)?;
    let vulnerability_id: i64 = row
        .try_get::<Option<i64>, _>("vulnerability_id")
        .map_err(get_err)?
        .unwrap_or(0);
    let total_count: i64 = row.try_get("total_count").map_err(get_err)?;

    let package_id: Option<i64> = row.try_get("package_id").map_err(get_err)?;
    let affected_package = match package_id {
        None => None,
        Some(package_id) => {
            let constraint_json: String = row
                .try_get::<Option<String>, _>("version_constraint")
                .map_err(get_err)?
                .unwrap_or_else(|| "[]".to_owned());
            let version_constraint: Vec<String> = serde_json::from_str(&constraint_json)
                .map_err(|e| VulnmatchError::decode("version_constraint", e))?;

            let fixed_in: String = row
                .try_get::<Option<String>, _>("fixed_in")
                .map_err(get_err)?
                .unwrap_or_default();

            let mut affected_symbols = Vec::new();
            let path: Option<String> = row.try_get("path").map_err(get_err)?;
            if let Some(path) = path
                && !path.is_empty()
            {
                let symbols_json: String = row
                    .try_get::<Option<String>, _>("symbols")
                    .map_err(get_err)?
                    .unwrap_or_else(|| "[]".to_owned());
                let symbols: Vec<String> = serde_json::from_str(&symbols_json)
                    .map_err(|e| VulnmatchError::decode("symbols", e))?;
                affected_symbols.push(AffectedSymbol { path, symbols });
            }

            Some(AffectedPackage {
                id: package_id,
                vulnerability_id,
                package_name: row
                    .try_get::<Option<String>, _>("package_name")
                    .map_err(get_err)?
                    .unwrap_or_default(),
                language: row
                    .try_get::<Option<String>, _>("language")
                    .map_err(get_err)?
                    .unwrap_or_default(),
                namespace: row
                    .try_get::<Option<String>, _>("namespace")
                    .map_err(get_err)?
                    .unwrap_or_default(),
                version_constraint,
                fixed: row
                    .try_get::<Option<bool>, _>("fixed")
                    .map_err(get_err)?
                    .unwrap_or(false),
                fixed_in: if fixed_in.is_empty() { None } else { Some(fixed_in) },
                affected_symbols,
            })
        }
    };

    Ok((
        VulnerabilityMatch {
            id,
            upload_id,
            vulnerability_id,
            affected_package,
        },
        total_count,
    ))
}

/// 정렬된 행 단위 매치를 논리 매치로 접습니다.
///
/// 행 순서를 보존하는 fold입니다: 매치 ID가 직전 그룹과 다르면 새 그룹을
/// 시작하고, 같으면 심볼을 해당 그룹의 패키지에 이어 붙입니다.
/// 업스트림 중복은 제거하지 않습니다 (un-flatten만 수행).
fn fold_match_rows(rows: Vec<VulnerabilityMatch>) -> Vec<VulnerabilityMatch> {
    let mut folded: Vec<VulnerabilityMatch> = Vec::new();

    for row in rows {
        match folded.last_mut() {
            Some(current) if current.id == row.id => {
                match (&mut current.affected_package, row.affected_package) {
                    (Some(package), Some(mut incoming)) => {
                        package
                            .affected_symbols
                            .append(&mut incoming.affected_symbols);
                    }
                    (None, Some(incoming)) => {
                        current.vulnerability_id = row.vulnerability_id;
                        current.affected_package = Some(incoming);
                    }
                    _ => {}
                }
            }
            _ => folded.push(row),
        }
    }

    folded
}

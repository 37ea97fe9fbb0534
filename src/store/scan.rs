//! 스캔 엔진 -- 참조/카탈로그 조인, 제약 필터링, 멱등 삽입
//!
//! [`MatchStore::scan_matches`]는 한 번의 호출에서 하나의 트랜잭션으로
//! 실행됩니다. 후보 생성은 의도적으로 관대한 부분 문자열 이름 매칭이며,
//! 정확성은 버전 제약 평가기가 보장합니다.
//!
//! # 멱등성
//!
//! 살아남은 `(upload_id, affected_package_id)` 쌍은
//! `ON CONFLICT DO NOTHING`으로 삽입되므로, 입력이 변하지 않은 재실행은
//! 아무 행도 추가하지 않습니다. 동시 실행도 유니크 제약이 흡수합니다.

use sqlx::Row;
use tracing::{debug, warn};

use crate::error::VulnmatchError;
use crate::scheme::SchemeMapping;
use crate::types::ScanReport;
use crate::version;

use super::MatchStore;

/// 쓰기 1회당 바인딩 파라미터 상한 (SQLite 기본 한도)
const MAX_BOUND_PARAMETERS: usize = 999;

/// 매치 삽입 1행당 컬럼 수
const INSERT_COLUMNS: usize = 2;

/// 후보 생성 쿼리
///
/// scheme/언어 disjunction이 `{where}` 자리에 바인딩 placeholder로 삽입됩니다.
const CANDIDATES_QUERY: &str = r"
SELECT
    r.upload_id AS upload_id,
    vap.id AS affected_package_id,
    r.version AS version,
    vap.version_constraint AS version_constraint
FROM vulnerability_affected_packages vap
JOIN package_references r ON instr(r.package_name, vap.package_name) > 0
WHERE {where}
";

/// 필터를 통과한 매치 후보
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    upload_id: i64,
    affected_package_id: i64,
    version: String,
    version_constraint: Vec<String>,
}

/// scheme 매핑으로 `(r.scheme = ? AND vap.language = ?)` disjunction을 만듭니다.
///
/// 매핑 순회가 결정적이므로 생성된 조건 순서도 실행마다 동일합니다.
fn scheme_filter_sql(mapping: &SchemeMapping) -> String {
    let conditions: Vec<&str> = mapping
        .iter()
        .map(|_| "(r.scheme = ? AND vap.language = ?)")
        .collect();
    conditions.join(" OR ")
}

impl MatchStore {
    /// 전체 참조와 카탈로그를 대상으로 새 매치를 탐색하고 영속화합니다.
    ///
    /// # 알고리즘
    ///
    /// 1. scheme 매핑으로 disjunction 조건을 구성
    /// 2. 이름 부분 문자열 + 언어 일치로 후보 생성
    /// 3. 각 후보를 버전 제약 평가기로 필터링. 파싱 불가능한 후보는
    ///    경고 로그 후 제외 (치명적이지 않음)
    /// 4. 생존 쌍을 파라미터 상한 이하의 청크로 나눠 중복 무시 삽입
    /// 5. 커밋. 1-5 중 어느 단계든 실패하면 전체가 롤백됨
    pub async fn scan_matches(&self) -> Result<ScanReport, VulnmatchError> {
        let mut report = ScanReport::default();

        if self.scheme_mapping.is_empty() {
            debug!("scheme mapping is empty, nothing to scan");
            return Ok(report);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VulnmatchError::store("begin scan transaction", e))?;

        let sql = CANDIDATES_QUERY.replace("{where}", &scheme_filter_sql(&self.scheme_mapping));
        let mut query = sqlx::query(&sql);
        for (scheme, language) in self.scheme_mapping.iter() {
            query = query.bind(scheme).bind(language);
        }

        let rows = query
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| VulnmatchError::store("select candidates", e))?;

        let mut survivors: Vec<(i64, i64)> = Vec::new();
        for row in rows {
            let candidate = decode_candidate(&row)?;
            report.candidates += 1;

            let (matches, valid) =
                version::satisfies(&candidate.version, &candidate.version_constraint);
            if !valid {
                report.invalid_versions += 1;
                warn!(
                    upload_id = candidate.upload_id,
                    affected_package_id = candidate.affected_package_id,
                    version = %candidate.version,
                    "unparseable version or constraint, skipping candidate"
                );
                continue;
            }
            if !matches {
                continue;
            }

            report.matched += 1;
            survivors.push((candidate.upload_id, candidate.affected_package_id));
        }

        // 마지막 부분 청크까지 커밋 전에 모두 밀어 넣는다
        let chunk_rows = MAX_BOUND_PARAMETERS / INSERT_COLUMNS;
        for chunk in survivors.chunks(chunk_rows) {
            report.inserted += insert_match_chunk(&mut tx, chunk).await?;
        }

        tx.commit()
            .await
            .map_err(|e| VulnmatchError::store("commit scan transaction", e))?;

        Ok(report)
    }
}

/// 후보 행을 디코딩합니다. `version_constraint`는 JSON 텍스트 배열입니다.
fn decode_candidate(row: &sqlx::sqlite::SqliteRow) -> Result<Candidate, VulnmatchError> {
    let constraint_json: String = row
        .try_get("version_constraint")
        .map_err(|e| VulnmatchError::store("decode candidate row", e))?;
    let version_constraint: Vec<String> = serde_json::from_str(&constraint_json)
        .map_err(|e| VulnmatchError::decode("version_constraint", e))?;

    Ok(Candidate {
        upload_id: row
            .try_get("upload_id")
            .map_err(|e| VulnmatchError::store("decode candidate row", e))?,
        affected_package_id: row
            .try_get("affected_package_id")
            .map_err(|e| VulnmatchError::store("decode candidate row", e))?,
        version: row
            .try_get("version")
            .map_err(|e| VulnmatchError::store("decode candidate row", e))?,
        version_constraint,
    })
}

/// 쌍 청크 하나를 중복 무시 모드로 삽입하고 실제 삽입된 행 수를 반환합니다.
async fn insert_match_chunk(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    pairs: &[(i64, i64)],
) -> Result<u64, VulnmatchError> {
    if pairs.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["(?, ?)"; pairs.len()].join(", ");
    let sql = format!(
        "INSERT INTO vulnerability_matches (upload_id, affected_package_id) \
         VALUES {placeholders} ON CONFLICT DO NOTHING"
    );

    let mut query = sqlx::query(&sql);
    for (upload_id, affected_package_id) in pairs {
        query = query.bind(*upload_id).bind(*affected_package_id);
    }

    let result = query
        .execute(&mut **tx)
        .await
        .map_err(|e| VulnmatchError::store("insert matches", e))?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchEngineConfig;

    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn scheme_filter_is_deterministic_disjunction() {
        let mapping = SchemeMapping::default();
        let sql = scheme_filter_sql(&mapping);
        assert_eq!(
            sql,
            "(r.scheme = ? AND vap.language = ?) OR (r.scheme = ? AND vap.language = ?)"
        );
    }

    #[test]
    fn scheme_filter_single_entry_has_no_or() {
        let mut mapping = SchemeMapping::empty();
        mapping.insert("gomod", "go");
        assert_eq!(scheme_filter_sql(&mapping), "(r.scheme = ? AND vap.language = ?)");
    }

    #[test]
    fn chunk_size_respects_parameter_ceiling() {
        let chunk_rows = MAX_BOUND_PARAMETERS / INSERT_COLUMNS;
        assert!(chunk_rows * INSERT_COLUMNS <= MAX_BOUND_PARAMETERS);
        assert!(chunk_rows > 0);
    }

    async fn test_store() -> MatchStore {
        // 메모리 DB는 커넥션마다 분리되므로 풀을 1개로 고정
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let config = MatchEngineConfig {
            database_url: "sqlite::memory:".to_owned(),
            max_connections: 1,
            ..MatchEngineConfig::default()
        };
        let store = MatchStore::new(pool, &config);
        store.migrate().await.unwrap();
        store
    }

    async fn seed_reference(store: &MatchStore, upload_id: i64, name: &str, version: &str, scheme: &str) {
        sqlx::query(
            "INSERT INTO package_references (upload_id, package_name, version, scheme) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(upload_id)
        .bind(name)
        .bind(version)
        .bind(scheme)
        .execute(store.pool())
        .await
        .unwrap();
    }

    async fn seed_affected_package(
        store: &MatchStore,
        id: i64,
        vulnerability_id: i64,
        name: &str,
        language: &str,
        constraints: &[&str],
    ) {
        let constraint_json = serde_json::to_string(constraints).unwrap();
        sqlx::query(
            "INSERT INTO vulnerability_affected_packages \
             (id, vulnerability_id, package_name, language, version_constraint) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(vulnerability_id)
        .bind(name)
        .bind(language)
        .bind(constraint_json)
        .execute(store.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn scan_persists_matching_pair() {
        let store = test_store().await;
        seed_reference(&store, 10, "github.com/foo/bar", "1.4.0", "gomod").await;
        seed_affected_package(&store, 5, 1, "bar", "go", &[">=1.0.0", "<1.5.0"]).await;

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(store.match_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scan_is_idempotent() {
        let store = test_store().await;
        seed_reference(&store, 10, "github.com/foo/bar", "1.4.0", "gomod").await;
        seed_affected_package(&store, 5, 1, "bar", "go", &[">=1.0.0", "<1.5.0"]).await;

        store.scan_matches().await.unwrap();
        let second = store.scan_matches().await.unwrap();

        assert_eq!(second.matched, 1);
        assert_eq!(second.inserted, 0);
        assert_eq!(store.match_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scan_skips_version_outside_range() {
        let store = test_store().await;
        seed_reference(&store, 10, "github.com/foo/bar", "1.5.0", "gomod").await;
        seed_affected_package(&store, 5, 1, "bar", "go", &[">=1.0.0", "<1.5.0"]).await;

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.matched, 0);
        assert_eq!(store.match_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scan_tolerates_unparseable_version() {
        let store = test_store().await;
        seed_reference(&store, 10, "github.com/foo/bar", "not-a-version", "gomod").await;
        seed_reference(&store, 11, "github.com/foo/bar", "1.2.0", "gomod").await;
        seed_affected_package(&store, 5, 1, "bar", "go", &[">=1.0.0", "<1.5.0"]).await;

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report.invalid_versions, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(store.match_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn scan_ignores_unmapped_scheme() {
        let store = test_store().await;
        seed_reference(&store, 10, "com.foo:bar", "1.4.0", "maven").await;
        seed_affected_package(&store, 5, 1, "bar", "java", &[">=1.0.0"]).await;

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report.candidates, 0);
        assert_eq!(store.match_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scan_requires_language_agreement() {
        let store = test_store().await;
        // scheme은 매핑되지만 카탈로그 언어가 어긋남
        seed_reference(&store, 10, "bar", "1.4.0", "gomod").await;
        seed_affected_package(&store, 5, 1, "bar", "Javascript", &[">=1.0.0"]).await;

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report.candidates, 0);
    }

    #[tokio::test]
    async fn scan_matches_name_by_substring() {
        let store = test_store().await;
        seed_reference(&store, 10, "github.com/foo/bar", "1.4.0", "gomod").await;
        seed_reference(&store, 11, "github.com/other/baz", "1.4.0", "gomod").await;
        seed_affected_package(&store, 5, 1, "bar", "go", &[">=1.0.0"]).await;

        let report = store.scan_matches().await.unwrap();
        // "github.com/foo/bar"만 "bar"를 포함
        assert_eq!(report.candidates, 1);
        assert_eq!(report.matched, 1);
    }

    #[tokio::test]
    async fn scan_inserts_more_pairs_than_one_chunk() {
        let store = test_store().await;
        seed_affected_package(&store, 1, 1, "bar", "go", &[">=0.1.0"]).await;
        // 청크 크기(499)를 넘는 업로드 수
        for upload_id in 0..600 {
            seed_reference(&store, upload_id, "bar", "1.0.0", "gomod").await;
        }

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report.inserted, 600);
        assert_eq!(store.match_count().await.unwrap(), 600);
    }

    #[tokio::test]
    async fn empty_mapping_scans_nothing() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let mut config = MatchEngineConfig::default();
        config.max_connections = 1;
        let mut store = MatchStore::new(pool, &config);
        store.scheme_mapping = SchemeMapping::empty();
        store.migrate().await.unwrap();

        let report = store.scan_matches().await.unwrap();
        assert_eq!(report, ScanReport::default());
    }
}

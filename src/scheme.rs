//! 생태계 scheme 매핑 -- 참조 scheme과 카탈로그 언어 레이블 대응표
//!
//! 패키지 참조의 `scheme`(모듈 생태계 태그)과 취약점 카탈로그의 `language`
//! 레이블은 서로 다른 어휘를 사용합니다. [`SchemeMapping`]이 그 대응을 정의하며,
//! 스캔 엔진의 후보 생성 쿼리에서만 사용됩니다.
//!
//! 매핑되지 않은 scheme은 의도된 no-match이며 결함이 아닙니다.

use std::collections::BTreeMap;

/// scheme → 카탈로그 언어 레이블 매핑
///
/// 결정적 순회 순서(BTreeMap)를 보장하므로 스캔 쿼리의 조건 순서가
/// 실행마다 동일하게 재현됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeMapping {
    map: BTreeMap<String, String>,
}

impl Default for SchemeMapping {
    /// 기본 매핑 테이블을 생성합니다.
    ///
    /// - `gomod` → `go`
    /// - `npm` → `Javascript`
    // TODO: maven scheme 매핑 (카탈로그의 JVM 언어 레이블 확정 후 추가)
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert("gomod".to_owned(), "go".to_owned());
        map.insert("npm".to_owned(), "Javascript".to_owned());
        Self { map }
    }
}

impl SchemeMapping {
    /// 빈 매핑을 생성합니다.
    pub fn empty() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// 기존 테이블에서 매핑을 생성합니다.
    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self { map }
    }

    /// scheme에 대응하는 언어 레이블을 반환합니다.
    pub fn language_for(&self, scheme: &str) -> Option<&str> {
        self.map.get(scheme).map(String::as_str)
    }

    /// 매핑 항목을 추가하거나 덮어씁니다.
    pub fn insert(&mut self, scheme: impl Into<String>, language: impl Into<String>) {
        self.map.insert(scheme.into(), language.into());
    }

    /// `(scheme, language)` 쌍을 scheme 오름차순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(s, l)| (s.as_str(), l.as_str()))
    }

    /// 매핑 항목 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 매핑이 비어있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

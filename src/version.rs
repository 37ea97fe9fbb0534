//! 시맨틱 버전 제약 평가 -- 버전이 취약점 영향 범위에 속하는지 판정
//!
//! `semver` 크레이트로 버전을 파싱하고, 쉼표로 결합된 범위 표현식 목록을
//! 논리곱(AND)으로 평가합니다.
//!
//! # 계약
//!
//! [`satisfies`]는 `(matches, valid)` 쌍을 반환합니다:
//!
//! - 버전 또는 제약 표현식이 파싱되지 않으면 `(false, false)`
//! - 둘 다 파싱되면 `valid = true`이고, 모든 제약을 만족할 때만 `matches = true`
//!
//! 파싱 실패는 후보 단위의 복구 가능한 조건이며 호출자에게 에러로 전파되지 않습니다.

use semver::Version;

/// 제약 비교 연산자
///
/// 연산자 집합이 이 평가기의 유일한 확장 지점입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    /// `=` (연산자 생략 시 기본값)
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

/// 파싱된 단일 제약 표현식
#[derive(Debug, Clone, PartialEq, Eq)]
struct Constraint {
    op: Op,
    version: Version,
}

impl Constraint {
    /// `op version` 형태의 표현식 하나를 파싱합니다.
    ///
    /// 연산자가 없으면 `=`로 해석합니다. 버전 토큰은 semver 규칙
    /// (major.minor.patch, 선택적 pre-release/build 접미사)을 따라야 합니다.
    fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();

        let (op, rest) = if let Some(rest) = expr.strip_prefix(">=") {
            (Op::Ge, rest)
        } else if let Some(rest) = expr.strip_prefix("<=") {
            (Op::Le, rest)
        } else if let Some(rest) = expr.strip_prefix("!=") {
            (Op::Ne, rest)
        } else if let Some(rest) = expr.strip_prefix('≥') {
            (Op::Ge, rest)
        } else if let Some(rest) = expr.strip_prefix('≤') {
            (Op::Le, rest)
        } else if let Some(rest) = expr.strip_prefix('>') {
            (Op::Gt, rest)
        } else if let Some(rest) = expr.strip_prefix('<') {
            (Op::Lt, rest)
        } else if let Some(rest) = expr.strip_prefix('=') {
            (Op::Eq, rest)
        } else {
            (Op::Eq, expr)
        };

        let version = Version::parse(rest.trim()).ok()?;
        Some(Self { op, version })
    }

    /// 주어진 버전이 이 제약을 만족하는지 확인합니다.
    fn check(&self, version: &Version) -> bool {
        match self.op {
            Op::Eq => *version == self.version,
            Op::Ne => *version != self.version,
            Op::Gt => *version > self.version,
            Op::Ge => *version >= self.version,
            Op::Lt => *version < self.version,
            Op::Le => *version <= self.version,
        }
    }
}

/// 버전이 제약 목록 전체를 만족하는지 평가합니다.
///
/// `constraints`는 쉼표로 결합된 하나의 범위 표현식으로 해석되며,
/// 각 요소는 `연산자 버전` 토큰입니다 (예: `">=1.0.0"`, `"<2.0.0"`).
///
/// # Returns
///
/// `(matches, valid)`:
///
/// - 버전이 semver로 파싱되지 않음 → `(false, false)`
/// - 표현식이 비었거나 하나라도 파싱되지 않음 → `(false, false)`
/// - 그 외 → `(모든 제약 만족 여부, true)`
///
/// 순수 함수이며 부수 효과가 없습니다.
pub fn satisfies(version: &str, constraints: &[String]) -> (bool, bool) {
    let Ok(version) = Version::parse(version.trim()) else {
        return (false, false);
    };

    let joined = constraints.join(",");
    let exprs: Vec<&str> = joined
        .split(',')
        .map(str::trim)
        .filter(|expr| !expr.is_empty())
        .collect();
    if exprs.is_empty() {
        return (false, false);
    }

    let mut parsed = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let Some(constraint) = Constraint::parse(expr) else {
            return (false, false);
        };
        parsed.push(constraint);
    }

    (parsed.iter().all(|c| c.check(&version)), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(exprs: &[&str]) -> Vec<String> {
        exprs.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn version_inside_conjunction_matches() {
        let (matches, valid) = satisfies("1.2.3", &constraints(&[">=1.0.0", "<2.0.0"]));
        assert!(matches);
        assert!(valid);
    }

    #[test]
    fn version_at_upper_bound_does_not_match() {
        let (matches, valid) = satisfies("2.0.0", &constraints(&[">=1.0.0", "<2.0.0"]));
        assert!(!matches);
        assert!(valid);
    }

    #[test]
    fn unparseable_version_is_invalid_not_fatal() {
        let (matches, valid) = satisfies("abc", &constraints(&[">=1.0.0"]));
        assert!(!matches);
        assert!(!valid);
    }

    #[test]
    fn unparseable_constraint_is_invalid() {
        let (matches, valid) = satisfies("1.0.0", &constraints(&["not-a-range"]));
        assert!(!matches);
        assert!(!valid);
    }

    #[test]
    fn empty_constraint_list_is_invalid() {
        let (matches, valid) = satisfies("1.0.0", &[]);
        assert!(!matches);
        assert!(!valid);
    }

    #[test]
    fn bare_version_means_equality() {
        let (matches, valid) = satisfies("1.0.0", &constraints(&["1.0.0"]));
        assert!(matches);
        assert!(valid);

        let (matches, valid) = satisfies("1.0.1", &constraints(&["1.0.0"]));
        assert!(!matches);
        assert!(valid);
    }

    #[test]
    fn explicit_equality_operator() {
        let (matches, valid) = satisfies("1.0.0", &constraints(&["=1.0.0"]));
        assert!(matches);
        assert!(valid);
    }

    #[test]
    fn not_equal_operator() {
        let (matches, valid) = satisfies("1.0.1", &constraints(&["!=1.0.0"]));
        assert!(matches);
        assert!(valid);

        let (matches, valid) = satisfies("1.0.0", &constraints(&["!=1.0.0"]));
        assert!(!matches);
        assert!(valid);
    }

    #[test]
    fn boundary_operators() {
        assert_eq!(satisfies("1.0.0", &constraints(&[">=1.0.0"])), (true, true));
        assert_eq!(satisfies("1.0.0", &constraints(&[">1.0.0"])), (false, true));
        assert_eq!(satisfies("1.0.0", &constraints(&["<=1.0.0"])), (true, true));
        assert_eq!(satisfies("1.0.0", &constraints(&["<1.0.0"])), (false, true));
    }

    #[test]
    fn unicode_comparison_aliases() {
        assert_eq!(satisfies("1.4.0", &constraints(&["≥1.0.0", "<1.5.0"])), (true, true));
        assert_eq!(satisfies("1.5.0", &constraints(&["≤1.4.0"])), (false, true));
    }

    #[test]
    fn single_element_with_embedded_commas() {
        // 카탈로그가 표현식을 하나의 문자열로 합쳐 보내는 경우
        let (matches, valid) = satisfies("1.2.3", &constraints(&[">=1.0.0, <2.0.0"]));
        assert!(matches);
        assert!(valid);
    }

    #[test]
    fn one_failing_constraint_fails_the_conjunction() {
        let (matches, valid) =
            satisfies("1.2.3", &constraints(&[">=1.0.0", "<2.0.0", "!=1.2.3"]));
        assert!(!matches);
        assert!(valid);
    }

    #[test]
    fn prerelease_orders_below_release() {
        // SemVer: 1.0.0-alpha < 1.0.0
        let (matches, valid) = satisfies("1.0.0-alpha", &constraints(&["<1.0.0"]));
        assert!(matches);
        assert!(valid);
    }

    #[test]
    fn whitespace_between_operator_and_version() {
        let (matches, valid) = satisfies("1.2.3", &constraints(&[">= 1.0.0", " < 2.0.0 "]));
        assert!(matches);
        assert!(valid);
    }

    #[test]
    fn two_component_version_is_invalid() {
        // go 스타일의 "1.4"는 semver가 아니므로 후보에서 제외됨
        let (matches, valid) = satisfies("1.4", &constraints(&[">=1.0.0"]));
        assert!(!matches);
        assert!(!valid);
    }
}

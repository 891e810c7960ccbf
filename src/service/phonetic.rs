//! 商品名称的归一化、语音编码与相似度
//!
//! 匹配规则只有一条, 由 [`MatchMode`] 决定:
//! - `Phonetic`: 两边的 Soundex 编码相同, 并且相似度 >= 阈值
//! - `Similarity`: 相似度 >= 阈值
//!
//! 相似度 = 100 × 归一化编辑距离相似度.

use rphonetic::{Encoder, Soundex};
use strsim::normalized_levenshtein;

use crate::models::MatchMode;

/// 小写, 非字母数字替换为空格, 合并空白
pub fn normalize_name(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .flat_map(|c| {
            let keep = c.is_alphanumeric();
            c.to_lowercase().map(move |l| if keep { l } else { ' ' })
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 0–100 的相似度, 输入应已归一化
pub fn similarity_score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// 逐词 Soundex 编码
pub struct PhoneticEncoder {
    soundex: Soundex,
}

impl Default for PhoneticEncoder {
    fn default() -> Self {
        Self {
            soundex: Soundex::default(),
        }
    }
}

impl PhoneticEncoder {
    /// 编码归一化后的名称, 无字母的词被忽略
    ///
    /// Soundex 只定义了 A-Z, 其余字符 (重音字母、CJK 等) 在编码前去掉.
    pub fn key(&self, normalized: &str) -> String {
        normalized
            .split_whitespace()
            .map(|token| token.chars().filter(char::is_ascii_alphabetic).collect::<String>())
            .filter(|letters| !letters.is_empty())
            .map(|letters| self.soundex.encode(&letters))
            .filter(|code| !code.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 单条名称的匹配结果
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub normalized: String,
    pub key: String,
    pub score: f64,
    pub matched: bool,
}

/// 判断商品名称是否属于目标商品的聚类
pub struct ProductMatcher {
    encoder: PhoneticEncoder,
    target: String,
    target_key: String,
    threshold: f64,
    mode: MatchMode,
}

impl ProductMatcher {
    pub fn new(target: &str, mode: MatchMode, threshold: f64) -> Self {
        let encoder = PhoneticEncoder::default();
        let target = normalize_name(target);
        let target_key = encoder.key(&target);
        Self {
            encoder,
            target,
            target_key,
            threshold,
            mode,
        }
    }

    pub fn evaluate(&self, candidate: &str) -> MatchOutcome {
        let normalized = normalize_name(candidate);
        let score = similarity_score(&normalized, &self.target);
        let key = self.encoder.key(&normalized);
        let matched = match self.mode {
            MatchMode::Phonetic => {
                !key.is_empty() && key == self.target_key && score >= self.threshold
            }
            MatchMode::Similarity => score >= self.threshold,
        };
        MatchOutcome {
            normalized,
            key,
            score,
            matched,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.evaluate(candidate).matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_whitespace_and_punctuation() {
        assert_eq!(normalize_name("  WIDGET "), "widget");
        assert_eq!(normalize_name("Blue-Widget  (XL)"), "blue widget xl");
        assert_eq!(normalize_name("--"), "");
    }

    #[test]
    fn soundex_keys() {
        let encoder = PhoneticEncoder::default();
        assert_eq!(encoder.key("robert"), "R163");
        assert_eq!(encoder.key("widget"), encoder.key("widjet"));
        assert_ne!(encoder.key("widget"), encoder.key("gadget"));
        assert_eq!(encoder.key("blue widget"), format!("{} {}", encoder.key("blue"), encoder.key("widget")));
    }

    #[test]
    fn non_ascii_letters_are_dropped_before_encoding() {
        let encoder = PhoneticEncoder::default();
        assert_eq!(encoder.key("café latte"), encoder.key("caf latte"));
        assert_eq!(encoder.key("crème"), encoder.key("creme"));
        assert_eq!(encoder.key("咖啡"), "");
        assert_eq!(encoder.key("咖啡 widget"), encoder.key("widget"));
    }

    #[test]
    fn accented_target_and_rows_do_not_break_matching() {
        let matcher = ProductMatcher::new("Crème", MatchMode::Phonetic, 50.0);
        assert!(matcher.matches("Creme"));
        assert!(matcher.matches("CRÈME "));
        assert!(!matcher.matches("Café Latte"));
        assert!(!matcher.matches("咖啡"));

        let widget = ProductMatcher::new("Widget", MatchMode::Phonetic, 0.0);
        assert!(!widget.matches("Café Latte"));
        assert!(widget.matches("Wídget"));
    }

    #[test]
    fn similarity_is_scaled_to_percent() {
        assert_eq!(similarity_score("widget", "widget"), 100.0);
        let score = similarity_score("widget", "widjet");
        assert!(score > 83.0 && score < 84.0);
        assert_eq!(similarity_score("", "widget"), 0.0);
    }

    #[test]
    fn phonetic_mode_requires_equal_keys() {
        let matcher = ProductMatcher::new("Widget", MatchMode::Phonetic, 0.0);
        assert!(matcher.matches("widjet"));
        assert!(matcher.matches(" WIDGET "));
        assert!(!matcher.matches("Gadget"));
        assert!(!matcher.matches("123"));
    }

    #[test]
    fn phonetic_mode_also_applies_threshold() {
        let strict = ProductMatcher::new("Widget", MatchMode::Phonetic, 90.0);
        assert!(strict.matches("Widget"));
        assert!(!strict.matches("Widjet"));
    }

    #[test]
    fn similarity_mode_ignores_keys() {
        let loose = ProductMatcher::new("Widget", MatchMode::Similarity, 60.0);
        assert!(loose.matches("Gadget"));

        let tight = ProductMatcher::new("Widget", MatchMode::Similarity, 80.0);
        assert!(tight.matches("Widjet"));
        assert!(!tight.matches("Gadget"));
    }

    #[test]
    fn evaluate_reports_details() {
        let matcher = ProductMatcher::new("Widget", MatchMode::Phonetic, 50.0);
        let outcome = matcher.evaluate("Widjet!");
        assert_eq!(outcome.normalized, "widjet");
        assert_eq!(outcome.key, PhoneticEncoder::default().key("widget"));
        assert!(outcome.matched);
    }
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const STYLE_TAG: &str = r"(?is:<style\b[^>]*>.*?</style>[ \t]*\r?\n?)";
const HTML_COMMENT: &str = r"(?s:<!--.*?-->)";
const SINGLE_LINE_COMMENT: &str = r"(?m:^[ \t]*//[^\n]*\n?)";
const MULTI_LINE_COMMENT: &str = r"(?s:/\*.*?\*/)";
const EMPTY_LINE: &str = r"(?m:^[ \t]*\r?\n)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub remove_style_tag: bool,
    pub remove_html_comments: bool,
    pub remove_single_line_comments: bool,
    pub remove_multi_line_comments: bool,
    pub remove_empty_lines: bool,
}

impl FilterOptions {
    pub fn any_enabled(&self) -> bool {
        self.remove_style_tag
            || self.remove_html_comments
            || self.remove_single_line_comments
            || self.remove_multi_line_comments
            || self.remove_empty_lines
    }
}

/// Compiled removal pass for one set of options.
///
/// Enabled patterns are joined into a single alternation so the content is
/// scanned once; earlier alternatives win where matches start at the same
/// position.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    pattern: Option<Regex>,
}

impl ContentFilter {
    pub fn new(options: &FilterOptions) -> Self {
        let parts: Vec<&str> = [
            (options.remove_style_tag, STYLE_TAG),
            (options.remove_html_comments, HTML_COMMENT),
            (options.remove_single_line_comments, SINGLE_LINE_COMMENT),
            (options.remove_multi_line_comments, MULTI_LINE_COMMENT),
            (options.remove_empty_lines, EMPTY_LINE),
        ]
        .into_iter()
        .filter_map(|(enabled, pattern)| enabled.then_some(pattern))
        .collect();

        let pattern = if parts.is_empty() {
            None
        } else {
            Some(Regex::new(&parts.join("|")).expect("built-in filter patterns must compile"))
        };
        Self { pattern }
    }

    /// Applies the removal pass and trims trailing whitespace.
    /// With nothing enabled the content is returned untouched, untrimmed.
    pub fn apply<'c>(&self, content: &'c str) -> Cow<'c, str> {
        match &self.pattern {
            None => Cow::Borrowed(content),
            Some(pattern) => {
                let replaced = pattern.replace_all(content, "");
                Cow::Owned(replaced.trim_end().to_string())
            }
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.pattern.is_none()
    }
}

pub fn filter<'c>(content: &'c str, options: &FilterOptions) -> Cow<'c, str> {
    ContentFilter::new(options).apply(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(f: impl FnOnce(&mut FilterOptions)) -> FilterOptions {
        let mut options = FilterOptions::default();
        f(&mut options);
        options
    }

    #[test]
    fn removes_style_tag_with_its_line_break() {
        let options = only(|o| o.remove_style_tag = true);
        assert_eq!(
            filter("<style>body{color:red}</style>\ncode();\n", &options),
            "code();"
        );
    }

    #[test]
    fn style_removal_is_case_insensitive_and_spans_lines() {
        let options = only(|o| o.remove_style_tag = true);
        let vue = "<template><div/></template>\n<STYLE scoped lang=\"scss\">\n.a {\n  color: red;\n}\n</Style>  \n<script>x()</script>\n";
        assert_eq!(
            filter(vue, &options),
            "<template><div/></template>\n<script>x()</script>"
        );
    }

    #[test]
    fn passthrough_keeps_trailing_whitespace() {
        let content = "code();   \n\n";
        let result = filter(content, &FilterOptions::default());
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, content);
    }

    #[test]
    fn removes_html_comments_across_lines() {
        let options = only(|o| o.remove_html_comments = true);
        assert_eq!(filter("<div><!-- a\nb --></div>\n", &options), "<div></div>");
    }

    #[test]
    fn removes_whole_line_single_comments_only() {
        let options = only(|o| o.remove_single_line_comments = true);
        let source = "// header\nconst a = 1; // trailing stays\n    // indented\nconst url = 'http://x';\n";
        assert_eq!(
            filter(source, &options),
            "const a = 1; // trailing stays\nconst url = 'http://x';"
        );
    }

    #[test]
    fn removes_block_comments_without_nesting() {
        let options = only(|o| o.remove_multi_line_comments = true);
        assert_eq!(filter("a /* x\n y */b", &options), "a b");
        assert_eq!(filter("/* /* inner */ tail */", &options), " tail */");
    }

    #[test]
    fn removes_blank_lines() {
        let options = only(|o| o.remove_empty_lines = true);
        assert_eq!(filter("a\n\n  \t\nb\n\n", &options), "a\nb");
    }

    #[test]
    fn combined_pass_respects_precedence() {
        let options = FilterOptions {
            remove_style_tag: true,
            remove_html_comments: true,
            remove_single_line_comments: true,
            remove_multi_line_comments: true,
            remove_empty_lines: true,
        };
        let source = "<template>\n  <!-- note -->\n  <p/>\n</template>\n\n<script>\n// setup\n/** doc */\nexport default {}\n</script>\n<style>\np { margin: 0 }\n</style>\n";
        assert_eq!(
            filter(source, &options),
            "<template>\n  \n  <p/>\n</template>\n<script>\n\nexport default {}\n</script>"
        );
    }

    #[test]
    fn compiled_filter_reports_passthrough() {
        assert!(ContentFilter::new(&FilterOptions::default()).is_passthrough());
        assert!(!ContentFilter::new(&only(|o| o.remove_empty_lines = true)).is_passthrough());
    }
}

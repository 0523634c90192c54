//! Markdown code-block analysis.
//!
//! A single pass over the document finds fenced code blocks carrying a file
//! path annotation and collects everything malformed as recoverable
//! [`AnalysisIssue`]s instead of errors. Two annotation styles are accepted:
//!
//! ````text
//! ```rust // src/lib.rs
//! fn main() {}
//! ```
//! ````
//!
//! or, with the path as the first line inside the fence:
//!
//! ````text
//! ```rust
//! // src/lib.rs
//! fn main() {}
//! ```
//! ````
//!
//! Any line whose left-trimmed text starts with three backticks toggles the
//! scanner between outside-block and inside-block. Nested fences are not
//! supported: a fence inside intended literal content closes the block.

use once_cell::sync::Lazy;
use regex::Regex;

/// Path on the fence line itself: ```[lang] // path/to/file.ext
static FENCE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^```(?:[a-z]+)?\s*//\s*(?P<path>\S.*?)\s*$").expect("fence path pattern")
});

/// Path as the first line inside the fence: // path/to/file.ext
static COMMENT_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//\s*(?P<path>\S.*?)\s*$").expect("comment path pattern"));

const FENCE_MARKER: &str = "```";

/// One validated fenced block: the target path and the exact text between
/// the fences (original lines joined with `\n`, fence lines excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub file_path: String,
    pub file_content: String,
    /// 1-based line number of the opening fence.
    pub start_line_number: usize,
}

/// A recoverable defect found during analysis. Issues never block the
/// processing of other, valid blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisIssue {
    /// 1-based line number the issue is attached to (the opening fence).
    pub line_number: usize,
    pub line_content: String,
    pub message: String,
}

/// The analyzer's sole output. `valid_blocks` is in document order; `issues`
/// is in point-of-detection order, with an unclosed trailing block last.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub valid_blocks: Vec<CodeBlock>,
    pub issues: Vec<AnalysisIssue>,
}

/// Scratch state for the block currently being scanned.
struct OpenBlock {
    line_number: usize,
    line_content: String,
    path: Option<String>,
    /// 0-based index of the first content line.
    content_start: usize,
}

enum ScanState {
    Outside,
    Inside(OpenBlock),
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE_MARKER)
}

fn fence_line_path(line: &str) -> Option<String> {
    FENCE_PATH_RE
        .captures(line.trim())
        .map(|caps| caps["path"].to_string())
}

fn comment_line_path(line: &str) -> Option<String> {
    COMMENT_PATH_RE
        .captures(line.trim())
        .map(|caps| caps["path"].to_string())
}

/// Analyzes markdown text and extracts all path-annotated code blocks.
///
/// Pure and deterministic: malformed input becomes an [`AnalysisIssue`],
/// never an error. Both `\n` and `\r\n` line endings are accepted; block
/// content is re-joined with `\n`.
pub fn analyze(markdown: &str) -> AnalysisResult {
    let lines: Vec<&str> = markdown
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut result = AnalysisResult::default();
    let mut state = ScanState::Outside;

    for (index, line) in lines.iter().enumerate() {
        if !is_fence(line) {
            continue;
        }

        state = match state {
            ScanState::Outside => {
                let (path, content_start) = match fence_line_path(line) {
                    Some(path) => (Some(path), index + 1),
                    None => match lines.get(index + 1).and_then(|next| comment_line_path(next)) {
                        Some(path) => (Some(path), index + 2),
                        None => (None, index + 1),
                    },
                };
                ScanState::Inside(OpenBlock {
                    line_number: index + 1,
                    line_content: (*line).to_string(),
                    path,
                    content_start,
                })
            }
            ScanState::Inside(open) => {
                match open.path {
                    Some(path) => {
                        let content = if open.content_start < index {
                            lines[open.content_start..index].join("\n")
                        } else {
                            String::new()
                        };
                        result.valid_blocks.push(CodeBlock {
                            file_path: path,
                            file_content: content,
                            start_line_number: open.line_number,
                        });
                    }
                    None => result.issues.push(AnalysisIssue {
                        line_number: open.line_number,
                        line_content: open.line_content,
                        message: "Code block found, but missing or invalid file path format. \
                                  Expected '```[lang] // path/to/file.ext' or a '// path/to/file.ext' \
                                  comment on the next line."
                            .to_string(),
                    }),
                }
                ScanState::Outside
            }
        };
    }

    if let ScanState::Inside(open) = state {
        result.issues.push(AnalysisIssue {
            line_number: open.line_number,
            line_content: open.line_content,
            message: "Unclosed code block: odd number of '```' delimiters. \
                      The block starting here has no matching closing fence."
                .to_string(),
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_valid_block() {
        let markdown = "# Test markdown\n\n```js // path/to/file.js\nconst x = 1;\n```\n";
        let result = analyze(markdown);

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_path, "path/to/file.js");
        assert_eq!(result.valid_blocks[0].file_content, "const x = 1;");
        assert_eq!(result.valid_blocks[0].start_line_number, 3);
    }

    #[test]
    fn single_line_scenario() {
        let result = analyze("```js // a.txt\nHELLO\n```");

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_path, "a.txt");
        assert_eq!(result.valid_blocks[0].file_content, "HELLO");
    }

    #[test]
    fn missing_path_yields_one_issue_and_no_blocks() {
        let result = analyze("```js\nconst x = 1;\n```");

        assert!(result.valid_blocks.is_empty());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].line_number, 1);
        assert!(result.issues[0].message.contains("missing or invalid file path"));
    }

    #[test]
    fn unclosed_block_yields_one_issue_at_the_opening_fence() {
        let result = analyze("```js // a.txt\nbody");

        assert!(result.valid_blocks.is_empty());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].line_number, 1);
        assert!(result.issues[0].message.contains("Unclosed code block"));
    }

    #[test]
    fn odd_delimiter_count_reports_exactly_one_issue() {
        let markdown = "\
```js // first.js
const a = 1;
```

```js // second.js
const b = 2;
```

```js // dangling.js
never closed";
        let result = analyze(markdown);

        assert_eq!(result.valid_blocks.len(), 2);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].line_number, 9);
        assert!(result.issues[0].message.contains("odd number"));
    }

    #[test]
    fn path_on_next_line_is_equivalent_to_fence_line_path() {
        let same_line = analyze("```js // path/to/file.js\nconst x = 1;\n```");
        let next_line = analyze("```js\n// path/to/file.js\nconst x = 1;\n```");

        assert!(same_line.issues.is_empty());
        assert!(next_line.issues.is_empty());
        assert_eq!(
            same_line.valid_blocks[0].file_path,
            next_line.valid_blocks[0].file_path
        );
        assert_eq!(
            same_line.valid_blocks[0].file_content,
            next_line.valid_blocks[0].file_content
        );
    }

    #[test]
    fn mixed_path_styles_across_blocks() {
        let markdown = "\
```js // path/to/file1.js
const x = 1;
```

```ts
// path/to/file2.ts
const y: number = 2;
```
";
        let result = analyze(markdown);

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks.len(), 2);
        assert_eq!(result.valid_blocks[0].file_path, "path/to/file1.js");
        assert_eq!(result.valid_blocks[1].file_path, "path/to/file2.ts");
        assert_eq!(result.valid_blocks[0].file_content, "const x = 1;");
        assert_eq!(result.valid_blocks[1].file_content, "const y: number = 2;");
    }

    #[test]
    fn next_line_path_is_excluded_from_content() {
        let markdown = "\
```typescript
// src/component.tsx
import React from 'react';

const Component = () => {
  return <div>Hello</div>;
};
```
";
        let result = analyze(markdown);

        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_path, "src/component.tsx");
        assert_eq!(
            result.valid_blocks[0].file_content,
            "import React from 'react';\n\nconst Component = () => {\n  return <div>Hello</div>;\n};"
        );
    }

    #[test]
    fn comment_spacing_variations() {
        let markdown = "\
```js //path/without/space.js
const noSpace = true;
```

```js
//path/without/space/on/next/line.js
const noSpaceNextLine = true;
```

```js // path/with/trailing/spaces.js
const trailingSpaces = true;
```
";
        let result = analyze(markdown);

        assert!(result.issues.is_empty());
        let paths: Vec<&str> = result
            .valid_blocks
            .iter()
            .map(|block| block.file_path.as_str())
            .collect();
        assert_eq!(
            paths,
            [
                "path/without/space.js",
                "path/without/space/on/next/line.js",
                "path/with/trailing/spaces.js",
            ]
        );
    }

    #[test]
    fn mixed_valid_and_invalid_blocks() {
        let markdown = "\
```js // path/to/file1.js
const x = 1;
```

```js
const y = 2;
```

```js // path/to/file2.js
const z = 3;
```
";
        let result = analyze(markdown);

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].line_number, 5);
        assert_eq!(result.valid_blocks.len(), 2);
        assert_eq!(result.valid_blocks[0].file_path, "path/to/file1.js");
        assert_eq!(result.valid_blocks[1].file_path, "path/to/file2.js");
    }

    #[test]
    fn empty_block_content_is_valid() {
        let result = analyze("```text // empty.txt\n```");

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_content, "");
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let result = analyze("```js // output/crlf.js\r\nconst x = 1;\r\n```\r\n");

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_content, "const x = 1;");
    }

    #[test]
    fn indented_fences_are_detected_and_content_keeps_indentation() {
        let markdown = "\
Some text before

    ```js // output/indented.js
    const indented = true;
    ```

Some text after
";
        let result = analyze(markdown);

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_path, "output/indented.js");
        assert_eq!(result.valid_blocks[0].file_content, "    const indented = true;");
    }

    #[test]
    fn whitespace_only_content_is_preserved() {
        let result = analyze("```text // ws.txt\n   \n  \n       \n```");

        assert_eq!(result.valid_blocks.len(), 1);
        assert_eq!(result.valid_blocks[0].file_content, "   \n  \n       ");
    }

    #[test]
    fn fence_without_path_comment_text_is_invalid() {
        let result = analyze("``` no-comment-syntax-here\nThis won't be processed.\n```");

        assert!(result.valid_blocks.is_empty());
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn path_less_fence_followed_by_plain_comment_content_keeps_the_comment() {
        // A same-line path wins; the comment inside stays content.
        let result = analyze("```js // valid2.js\n// Empty is okay too\n```");

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks[0].file_content, "// Empty is okay too");
    }

    #[test]
    fn paths_are_trimmed_and_dots_survive() {
        let markdown = "\
```yaml // .config/settings.yaml
setting: value
```
```dockerfile // ./.docker/Dockerfile.prod
FROM alpine
```
";
        let result = analyze(markdown);

        assert!(result.issues.is_empty());
        assert_eq!(result.valid_blocks[0].file_path, ".config/settings.yaml");
        assert_eq!(result.valid_blocks[1].file_path, "./.docker/Dockerfile.prod");
    }

    #[test]
    fn no_blocks_means_empty_result() {
        let result = analyze("Just plain text.\nNo code blocks here.");

        assert!(result.valid_blocks.is_empty());
        assert!(result.issues.is_empty());
    }
}

//! An `oxc` based minifier behind the [`OutputPlugin`] interface of `minimize`.
use std::path::PathBuf;

use async_trait::async_trait;
use minimize::{
    BoxError, CommentKind, CommentToken, Implementation, MinifierOptions, OutputOptions, OutputPlugin,
    RenderOutput, RenderedChunk, SourceMap,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum MinifyError {
    #[error("Invalid UTF-8 in {file}")]
    InvalidUtf8 { file: String },

    #[error("Syntax error in {file}: {message}")]
    Syntax { file: String, message: String },
}

/// Minified code with the comments that survived and, if requested, its source map.
pub struct Minified {
    pub code: String,
    /// Source map as JSON.
    pub map: Option<String>,
}

pub fn minify_js(js: &[u8]) -> Result<Vec<u8>, MinifyError> {
    minify_bytes(oxc_span::SourceType::jsx(), js)
}

pub fn minify_mjs(mjs: &[u8]) -> Result<Vec<u8>, MinifyError> {
    minify_bytes(oxc_span::SourceType::mjs(), mjs)
}

fn minify_bytes(source_type: oxc_span::SourceType, code: &[u8]) -> Result<Vec<u8>, MinifyError> {
    let code = std::str::from_utf8(code).map_err(|_| MinifyError::InvalidUtf8 {
        file: String::from("<inline>"),
    })?;

    let options = MinifierOptions::default();
    let minified = minify(source_type, code, "<inline>", &options, false)?;
    Ok(minified.code.into_bytes())
}

/// A minifier configured from merged `minimize` options.
///
/// Understands `module` (parse as ES module or script), `compress` (`false` to disable, or an
/// object with `drop_console` and `drop_debugger`), `mangle` and the comment policy.
pub struct OxcMinifier {
    options: MinifierOptions,
}

/// The implementation to hand to [`minimize::minimize`].
pub fn oxc_factory() -> Implementation {
    Implementation::factory(OxcMinifier::new)
}

impl OxcMinifier {
    pub fn new(options: MinifierOptions) -> Self {
        OxcMinifier { options }
    }

    pub fn minify(&self, code: &str, file: &str, sourcemap: bool) -> Result<Minified, MinifyError> {
        let source_type = if self.options.enabled("module") == Some(false) {
            oxc_span::SourceType::mjs().with_module(false)
        } else {
            oxc_span::SourceType::mjs()
        };

        minify(source_type, code, file, &self.options, sourcemap)
    }
}

#[async_trait]
impl OutputPlugin for OxcMinifier {
    fn name(&self) -> &str {
        "oxc-minify"
    }

    async fn render_chunk(
        &self,
        source: &str,
        chunk: &RenderedChunk,
        output: &OutputOptions,
    ) -> Result<Option<RenderOutput>, BoxError> {
        let Minified { code, map } = self.minify(source, &chunk.file_name, output.sourcemap)?;

        tracing::debug!(
            chunk = %chunk.file_name,
            "Minified size: {} bytes from {}",
            code.len(),
            source.len()
        );

        Ok(Some(RenderOutput::from_parts(
            code,
            map.map(SourceMap::from_json),
        )))
    }
}

fn minify(
    source_type: oxc_span::SourceType,
    code: &str,
    file: &str,
    options: &MinifierOptions,
    sourcemap: bool,
) -> Result<Minified, MinifyError> {
    use oxc_allocator::Allocator;
    use oxc_codegen::{Codegen, CodegenOptions, CommentOptions};
    use oxc_minifier::Minifier;
    use oxc_parser::Parser;

    let allocator = Allocator::default();
    let mut parsed = Parser::new(&allocator, code, source_type).parse();

    if let Some(error) = parsed.errors.first() {
        return Err(MinifyError::Syntax {
            file: file.to_owned(),
            message: error.to_string(),
        });
    }

    // Codegen has no predicate for comments. We judge them here, once per call, and append the
    // survivors after the code so the source map stays aligned.
    let mut decision = options.comments.decision();
    let comments: Vec<CommentToken> = parsed
        .program
        .comments
        .iter()
        .filter_map(|comment| {
            let mut token = comment_token(code, comment.span.start, comment.span.end)?;
            decision.keep(&mut token).then_some(token)
        })
        .collect();

    let minifier = Minifier::new(minifier_options(options));
    let minified = minifier.minify(&allocator, &mut parsed.program);

    let codegen = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: sourcemap.then(|| PathBuf::from(file)),
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&parsed.program);

    let mut code = codegen.code;
    append_comments(&mut code, &comments);

    Ok(Minified {
        code,
        map: codegen.map.map(|map| map.to_json_string()),
    })
}

fn minifier_options(options: &MinifierOptions) -> oxc_minifier::MinifierOptions {
    use oxc_minifier::{CompressOptions, MangleOptions};

    let flag = |pointer: &str| options.get(pointer).and_then(Value::as_bool);

    let compress = options.enabled("compress").unwrap_or(true).then(|| CompressOptions {
        drop_console: flag("/compress/drop_console").unwrap_or(false),
        drop_debugger: flag("/compress/drop_debugger").unwrap_or(false),
        ..CompressOptions::default()
    });
    let mangle = options
        .enabled("mangle")
        .unwrap_or(true)
        .then(MangleOptions::default);

    oxc_minifier::MinifierOptions {
        mangle,
        compress,
        ..oxc_minifier::MinifierOptions::default()
    }
}

/// Append kept comments, each on a new line when it started one in the source.
fn append_comments(code: &mut String, comments: &[CommentToken]) {
    let mut after_line_comment = false;

    for comment in comments {
        let line_break = after_line_comment || comment.leading_newline;
        if line_break && !code.is_empty() && !code.ends_with('\n') {
            code.push('\n');
        }

        code.push_str(&comment.to_source());
        after_line_comment = comment.kind == CommentKind::Line;
    }
}

/// Turn the comment spanning `start..end` of `code`, delimiters included, into a token.
fn comment_token(code: &str, start: u32, end: u32) -> Option<CommentToken> {
    let (start, end) = (start as usize, end as usize);
    let raw = code.get(start..end)?;

    let mut token = if let Some(body) = raw.strip_prefix("/*") {
        CommentToken::block(body.strip_suffix("*/").unwrap_or(body))
    } else {
        CommentToken::line(raw.strip_prefix("//")?)
    };

    let line_start = code[..start].rfind('\n').map_or(0, |idx| idx + 1);
    token.leading_newline = code[line_start..start].trim().is_empty();
    Some(token)
}

//! The minify orchestrator: a wrapper around an output plugin that minifies chunks.
//!
//! The wrapper first lets the delegate render a chunk, then stamps the result with the configured
//! banner and a footer carrying the checksum of the stamped code. Everything else the delegate
//! does is forwarded unchanged.
use async_trait::async_trait;
use serde_json::Value;

use crate::{
    deferred::{self, Deferred},
    error::{BoxError, PluginError},
    options::MinifierOptions,
    stamp,
};

/// A source map as produced by the wrapped minifier, kept as opaque JSON text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMap(String);

impl SourceMap {
    pub fn from_json(json: impl Into<String>) -> Self {
        SourceMap(json.into())
    }

    pub fn as_json(&self) -> &str {
        &self.0
    }

    pub fn into_json(self) -> String {
        self.0
    }
}

/// What rendering a chunk produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutput {
    Code(String),
    CodeWithMap { code: String, map: SourceMap },
}

impl RenderOutput {
    pub fn from_parts(code: String, map: Option<SourceMap>) -> Self {
        match map {
            Some(map) => RenderOutput::CodeWithMap { code, map },
            None => RenderOutput::Code(code),
        }
    }

    pub fn into_parts(self) -> (String, Option<SourceMap>) {
        match self {
            RenderOutput::Code(code) => (code, None),
            RenderOutput::CodeWithMap { code, map } => (code, Some(map)),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            RenderOutput::Code(code) | RenderOutput::CodeWithMap { code, .. } => code,
        }
    }

    pub fn map(&self) -> Option<&SourceMap> {
        match self {
            RenderOutput::Code(_) => None,
            RenderOutput::CodeWithMap { map, .. } => Some(map),
        }
    }
}

/// Metadata of the chunk being rendered.
#[derive(Clone, Debug, Default)]
pub struct RenderedChunk {
    /// The chunk's logical name, usually the entry's file stem.
    pub name: String,
    /// Name of the file the chunk will be written to.
    pub file_name: String,
}

/// Output settings active while rendering.
#[derive(Clone, Debug, Default)]
pub struct OutputOptions {
    pub banner: Option<Deferred<String>>,
    pub footer: Option<Deferred<String>>,
    pub sourcemap: bool,
}

/// The render hooks of an output plugin.
#[async_trait]
pub trait OutputPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once per output before any chunk is rendered.
    async fn render_start(&self, _output: &OutputOptions) -> Result<(), BoxError> {
        Ok(())
    }

    /// Transform one chunk. `Ok(None)` means the plugin left the chunk alone.
    async fn render_chunk(
        &self,
        source: &str,
        chunk: &RenderedChunk,
        output: &OutputOptions,
    ) -> Result<Option<RenderOutput>, BoxError>;
}

/// Builds a minifier plugin from the merged minifier options.
pub type Factory = Box<dyn FnOnce(MinifierOptions) -> Box<dyn OutputPlugin> + Send>;

/// The minifier being wrapped.
pub enum Implementation {
    Factory(Factory),
    Instance(Box<dyn OutputPlugin>),
}

impl Implementation {
    pub fn factory<F, P>(build: F) -> Self
    where
        F: FnOnce(MinifierOptions) -> P + Send + 'static,
        P: OutputPlugin + 'static,
    {
        Implementation::Factory(Box::new(move |options| {
            Box::new(build(options)) as Box<dyn OutputPlugin>
        }))
    }

    pub fn instance<P>(plugin: P) -> Self
    where
        P: OutputPlugin + 'static,
    {
        Implementation::Instance(Box::new(plugin))
    }
}

#[derive(Default)]
pub struct PluginConfig {
    pub implementation: Option<Implementation>,
    /// Return the minifier's output without banner and footer.
    pub disabled: bool,
    /// Raw options merged into the minifier options, only used with a factory.
    pub options: Value,
}

/// Wraps the minifier plugin and stamps its output.
pub struct MinimizePlugin {
    delegate: Box<dyn OutputPlugin>,
    disabled: bool,
}

/// Create the wrapping plugin.
///
/// Fails immediately if no implementation is given or the options can not be turned into
/// minifier options.
pub fn minimize(config: PluginConfig) -> Result<MinimizePlugin, PluginError> {
    MinimizePlugin::new(config)
}

impl MinimizePlugin {
    pub fn new(config: PluginConfig) -> Result<Self, PluginError> {
        let PluginConfig {
            implementation,
            disabled,
            options,
        } = config;

        let delegate = match implementation.ok_or(PluginError::MissingImplementation)? {
            Implementation::Factory(build) => build(MinifierOptions::build(&options)?),
            Implementation::Instance(plugin) => plugin,
        };

        Ok(MinimizePlugin { delegate, disabled })
    }

    /// The wrapped minifier.
    pub fn delegate(&self) -> &dyn OutputPlugin {
        &*self.delegate
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

#[async_trait]
impl OutputPlugin for MinimizePlugin {
    fn name(&self) -> &str {
        "minimize"
    }

    async fn render_start(&self, output: &OutputOptions) -> Result<(), BoxError> {
        self.delegate.render_start(output).await
    }

    async fn render_chunk(
        &self,
        source: &str,
        chunk: &RenderedChunk,
        output: &OutputOptions,
    ) -> Result<Option<RenderOutput>, BoxError> {
        let Some(rendered) = self.delegate.render_chunk(source, chunk, output).await? else {
            return Ok(None);
        };

        if self.disabled {
            return Ok(Some(rendered));
        }

        let (code, map) = rendered.into_parts();

        let banner = deferred::resolve(output.banner.as_ref()).await;
        let code = stamp::prepend_banner(code, banner.as_deref().unwrap_or_default());

        let footer = deferred::resolve(output.footer.as_ref()).await;
        let code = stamp::append_footer(code, footer.as_deref().unwrap_or_default());

        tracing::debug!(
            chunk = %chunk.file_name,
            minifier = self.delegate.name(),
            source_len = source.len(),
            stamped_len = code.len(),
            "stamped chunk"
        );

        Ok(Some(RenderOutput::from_parts(code, map)))
    }
}

/// Take a project configuration and write every output of every entry: minified, stamped and
/// with its source map where requested.
use std::{fs, path::PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use minimize::{
    BoxError, Deferred, MinimizePlugin, OutputOptions, OutputPlugin as _, PluginConfig,
    RenderOutput, RenderedChunk, deferred, stamp,
};

use crate::project::{Configuration, Entry, Output, Sourcemap};

const SOURCE_MAPPING_URL: &str = "//# sourceMappingURL=";

pub fn run(configuration: &Configuration, disabled: bool) -> Result<(), BoxError> {
    let plugin = minimize::minimize(PluginConfig {
        implementation: Some(minimize_minify_js::oxc_factory()),
        disabled: disabled || configuration.settings.disabled,
        options: configuration.settings.options.clone(),
    })?;

    for entry in &configuration.entries {
        let source = fs::read_to_string(&entry.input)?;

        for output in &entry.outputs {
            let rendered = pollster::block_on(render(&plugin, entry, output, &source))?;
            write(output, rendered)?;

            tracing::info!(input = %entry.input.display(), output = %output.file.display(), "written");
        }
    }

    Ok(())
}

fn output_options(output: &Output) -> OutputOptions {
    let banner = match (&output.banner_file, &output.banner) {
        (Some(path), _) => {
            let path = path.clone();
            Some(Deferred::from_fn(move || {
                fs::read_to_string(&path).unwrap_or_else(|err| {
                    tracing::warn!(path = %path.display(), %err, "banner file unreadable, skipping banner");
                    String::new()
                })
            }))
        }
        (None, Some(text)) => Some(Deferred::from(text.as_str())),
        (None, None) => None,
    };

    OutputOptions {
        banner,
        footer: output.footer.as_deref().map(Deferred::from),
        sourcemap: output.sourcemap.requested(),
    }
}

async fn render(
    plugin: &MinimizePlugin,
    entry: &Entry,
    output: &Output,
    source: &str,
) -> Result<RenderOutput, BoxError> {
    let options = output_options(output);

    if !output.minimize {
        let banner = deferred::resolve(options.banner.as_ref()).await;
        let code = stamp::prepend_banner(source.to_owned(), banner.as_deref().unwrap_or_default());
        return Ok(RenderOutput::Code(code));
    }

    let chunk = RenderedChunk {
        name: entry.name(),
        file_name: output
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    plugin.render_start(&options).await?;
    let rendered = plugin.render_chunk(source, &chunk, &options).await?;

    Ok(rendered.unwrap_or_else(|| RenderOutput::Code(source.to_owned())))
}

fn write(output: &Output, rendered: RenderOutput) -> Result<(), BoxError> {
    if let Some(parent) = output.file.parent() {
        fs::create_dir_all(parent)?;
    }

    let (mut code, map) = rendered.into_parts();

    if let Some(map) = map {
        match output.sourcemap {
            Sourcemap::Off => {}
            Sourcemap::File | Sourcemap::Hidden => {
                let path = map_path(&output.file);
                fs::write(&path, map.as_json())?;

                if output.sourcemap == Sourcemap::File {
                    let name = path.file_name().unwrap_or_default().to_string_lossy();
                    code.push_str(stamp::EOL);
                    code.push_str(SOURCE_MAPPING_URL);
                    code.push_str(&name);
                }
            }
            Sourcemap::Inline => {
                code.push_str(stamp::EOL);
                code.push_str(SOURCE_MAPPING_URL);
                code.push_str("data:application/json;charset=utf-8;base64,");
                code.push_str(&STANDARD.encode(map.as_json()));
            }
        }
    }

    fs::write(&output.file, code)?;
    Ok(())
}

fn map_path(file: &std::path::Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

/// The code without a trailing source map reference.
pub fn strip_source_mapping_url(code: &str) -> &str {
    let Some(idx) = code.rfind(SOURCE_MAPPING_URL) else {
        return code;
    };

    if code[idx..].contains('\n') {
        return code;
    }

    let code = &code[..idx];
    code.strip_suffix(stamp::EOL).unwrap_or(code)
}

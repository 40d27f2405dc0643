//! Configuration templating.
//!
//! Templates use positional composite formatting: `{0}` is the first
//! substitution, `{1}` the second, and literal braces are doubled (`{{`, `}}`).
//! nginx configuration is brace-heavy, so every literal block brace in a
//! template must be escaped.
//!
//! Destinations are always regenerated from scratch: an existing file is
//! removed before the new content is written.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from rendering or writing a template
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template {path:?}: {source}")]
    ReadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    WriteDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Placeholder {{{index}}} has no value ({available} substitution(s) given)")]
    PlaceholderOutOfRange { index: usize, available: usize },

    #[error("Unbalanced '{brace}' at byte {offset} (literal braces must be doubled)")]
    UnbalancedBrace { brace: char, offset: usize },

    #[error("Invalid placeholder {text:?} at byte {offset}")]
    InvalidPlaceholder { text: String, offset: usize },
}

/// Renders templates into configuration files
pub trait ConfigTemplater {
    fn materialize(
        &self,
        template: &Path,
        destination: &Path,
        substitutions: &[&str],
    ) -> Result<(), TemplateError>;
}

/// Templater backed by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTemplater;

impl ConfigTemplater for FsTemplater {
    fn materialize(
        &self,
        template: &Path,
        destination: &Path,
        substitutions: &[&str],
    ) -> Result<(), TemplateError> {
        let body = fs::read_to_string(template).map_err(|source| TemplateError::ReadTemplate {
            path: template.to_path_buf(),
            source,
        })?;

        // Render before touching the destination so a bad template leaves it intact
        let rendered = render(&body, substitutions)?;

        let write_err = |source: std::io::Error| TemplateError::WriteDestination {
            path: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating directory {:?}", parent);
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        if destination.exists() {
            debug!("Removing existing {:?}", destination);
            fs::remove_file(destination).map_err(write_err)?;
        }

        fs::write(destination, rendered).map_err(write_err)?;
        info!("Materialized {:?} from {:?}", destination, template);
        Ok(())
    }
}

/// Substitute positional placeholders in `template`.
pub fn render(template: &str, substitutions: &[&str]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let mut text = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    text.push(inner);
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBrace { brace: '{', offset });
                }

                let index: usize = text
                    .trim()
                    .parse()
                    .map_err(|_| TemplateError::InvalidPlaceholder {
                        text: format!("{{{}}}", text),
                        offset,
                    })?;
                let value = substitutions.get(index).ok_or(
                    TemplateError::PlaceholderOutOfRange {
                        index,
                        available: substitutions.len(),
                    },
                )?;
                out.push_str(value);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::UnbalancedBrace { brace: '}', offset });
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_substitutes_every_occurrence() {
        let out = render("server_name {0} www.{0};", &["example.com"]).unwrap();
        assert_eq!(out, "server_name example.com www.example.com;");
    }

    #[test]
    fn test_render_escaped_braces() {
        let out = render("server {{\n  listen 80;\n}}\n", &[]).unwrap();
        assert_eq!(out, "server {\n  listen 80;\n}\n");
    }

    #[test]
    fn test_render_multiple_positions() {
        let out = render("{1}-{0}", &["a", "b"]).unwrap();
        assert_eq!(out, "b-a");
    }

    #[test]
    fn test_render_out_of_range() {
        let err = render("{1}", &["only"]).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::PlaceholderOutOfRange { index: 1, available: 1 }
        ));
    }

    #[test]
    fn test_render_unbalanced_braces() {
        assert!(matches!(
            render("server {\n", &[]).unwrap_err(),
            TemplateError::UnbalancedBrace { brace: '{', .. }
        ));
        assert!(matches!(
            render("}\n", &[]).unwrap_err(),
            TemplateError::UnbalancedBrace { brace: '}', offset: 0 }
        ));
    }

    #[test]
    fn test_render_rejects_non_numeric_placeholder() {
        let err = render("{domain}", &["x"]).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidPlaceholder { .. }));
    }

    #[test]
    fn test_materialize_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.conf");
        fs::write(&template, "host {0}\n").unwrap();
        let dest = dir.path().join("a/b/out.conf");

        FsTemplater.materialize(&template, &dest, &["x.org"]).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "host x.org\n");
    }

    #[test]
    fn test_materialize_missing_template() {
        let dir = TempDir::new().unwrap();
        let err = FsTemplater
            .materialize(&dir.path().join("nope"), &dir.path().join("out"), &[])
            .unwrap_err();
        assert!(matches!(err, TemplateError::ReadTemplate { .. }));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_bad_template_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.conf");
        fs::write(&template, "server {\n").unwrap();
        let dest = dir.path().join("out.conf");
        fs::write(&dest, "previous").unwrap();

        assert!(FsTemplater.materialize(&template, &dest, &[]).is_err());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous");
    }
}

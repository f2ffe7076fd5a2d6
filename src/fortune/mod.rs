//! Fortune text and art generation.
//!
//! The response body is produced by two capabilities:
//!
//! - a [`TextSource`] yielding one short random message per call
//! - an [`ArtRenderer`] wrapping arbitrary text in monospace art
//!
//! Each has an external-program implementation (`fortune`, `cowsay`) and an
//! in-process one. Text travels as raw bytes so program output reaches the
//! page unchanged. [`FortunePage`] composes them into the HTML body served for
//! every request.

pub mod builtin;
pub mod command;
pub mod page;

use std::future::Future;

use anyhow::bail;

use crate::config::{CapabilityKind, Config};

pub use builtin::{BuiltinCow, BuiltinFortunes};
pub use command::{CommandArtRenderer, CommandTextSource, locate_program};
pub use page::FortunePage;

/// Produces the message to render.
pub trait TextSource: Send + Sync {
    fn next(&self) -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;
}

/// Decorates a message with art.
pub trait ArtRenderer: Send + Sync {
    fn render(&self, text: &[u8]) -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;
}

/// Text source selected by configuration.
#[derive(Debug, Clone)]
pub enum Source {
    Command(CommandTextSource),
    Builtin(BuiltinFortunes),
}

/// Renderer selected by configuration.
#[derive(Debug, Clone)]
pub enum Renderer {
    Command(CommandArtRenderer),
    Builtin(BuiltinCow),
}

impl Source {
    pub fn from_config(cfg: &Config) -> Self {
        match cfg.fortune.source {
            CapabilityKind::Command => Source::Command(CommandTextSource::new(
                cfg.fortune.program.clone(),
                cfg.fortune.args.clone(),
                cfg.timeouts.generate(),
            )),
            CapabilityKind::Builtin if cfg.fortune.messages.is_empty() => {
                Source::Builtin(BuiltinFortunes::default())
            }
            CapabilityKind::Builtin => {
                Source::Builtin(BuiltinFortunes::new(cfg.fortune.messages.clone()))
            }
        }
    }
}

impl Renderer {
    pub fn from_config(cfg: &Config) -> Self {
        match cfg.renderer.kind {
            CapabilityKind::Command => Renderer::Command(CommandArtRenderer::new(
                cfg.renderer.program.clone(),
                cfg.renderer.args.clone(),
                cfg.timeouts.generate(),
            )),
            CapabilityKind::Builtin => Renderer::Builtin(BuiltinCow::default()),
        }
    }
}

impl TextSource for Source {
    async fn next(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            Source::Command(source) => source.next().await,
            Source::Builtin(source) => source.next().await,
        }
    }
}

impl ArtRenderer for Renderer {
    async fn render(&self, text: &[u8]) -> anyhow::Result<Vec<u8>> {
        match self {
            Renderer::Command(renderer) => renderer.render(text).await,
            Renderer::Builtin(renderer) => renderer.render(text).await,
        }
    }
}

/// Fails if an external program the configuration relies on is not installed.
pub fn check_prerequisites(cfg: &Config) -> anyhow::Result<()> {
    let mut required = Vec::new();
    if cfg.fortune.source == CapabilityKind::Command {
        required.push(cfg.fortune.program.as_str());
    }
    if cfg.renderer.kind == CapabilityKind::Command {
        required.push(cfg.renderer.program.as_str());
    }

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|program| locate_program(program).is_none())
        .collect();

    if !missing.is_empty() {
        bail!("required programs not found on PATH: {}", missing.join(", "));
    }

    Ok(())
}

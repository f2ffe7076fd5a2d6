use anyhow::{Context, Result, bail};

use crate::fortune::{ArtRenderer, TextSource};

/// Composes a text source and an art renderer into the served HTML body.
#[derive(Debug, Clone)]
pub struct FortunePage<S, R> {
    source: S,
    renderer: R,
}

impl<S, R> FortunePage<S, R>
where
    S: TextSource,
    R: ArtRenderer,
{
    pub fn new(source: S, renderer: R) -> Self {
        Self { source, renderer }
    }

    /// Generates a fresh body: a fortune rendered as art inside `<pre>`.
    pub async fn body(&self) -> Result<Vec<u8>> {
        let text = self.source.next().await.context("fortune source failed")?;
        let art = self
            .renderer
            .render(&text)
            .await
            .context("art renderer failed")?;

        if art.iter().all(u8::is_ascii_whitespace) {
            bail!("art renderer returned nothing");
        }

        Ok(wrap_pre(&art))
    }
}

/// Embeds `art` verbatim in a preformatted block so browsers keep its spacing.
pub fn wrap_pre(art: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(art.len() + 11);
    body.extend_from_slice(b"<pre>");
    body.extend_from_slice(art);
    body.extend_from_slice(b"</pre>");
    body
}

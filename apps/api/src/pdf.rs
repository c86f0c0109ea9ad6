// PDF → raw text. Page text is concatenated; no layout is preserved.

use anyhow::Context;

/// Parses a PDF held fully in memory. CPU-bound, so it runs on the blocking pool.
pub async fn extract_text_from_pdf(bytes: Vec<u8>) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || extract_text_sync(&bytes))
        .await
        .context("PDF extraction task panicked")?
}

fn extract_text_sync(bytes: &[u8]) -> anyhow::Result<String> {
    pdf_extract::extract_text_from_mem(bytes).context("failed to extract text from PDF bytes")
}

/// True when the declared content type or the magic bytes say PDF.
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}

//! Streaming a shared file to a client.

use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};
use crate::share::SharedFileCatalog;

/// A download whose file is open and whose headers are decided.
///
/// `Content-Length` is the size of the open file, not the size recorded when
/// it was shared, and exactly that many bytes are sent.
#[derive(Debug)]
pub struct PreparedDownload {
    name: String,
    file: File,
    size: u64,
    content_type: String,
}

impl PreparedDownload {
    /// Look `name` up in the catalog and open its file.
    ///
    /// Fails with [`Error::NotFound`] when the name is not shared and
    /// [`Error::FileMissing`] when the file has left the disk since.
    pub async fn open(catalog: &SharedFileCatalog, name: &str) -> Result<Self, Error> {
        let shared = catalog
            .lookup(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        let file = match File::open(&shared.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::FileMissing(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(Error::FileMissing(name.to_string()));
        }
        if metadata.len() != shared.size {
            debug!(
                "'{name}' changed size since it was shared ({} -> {} bytes)",
                shared.size,
                metadata.len()
            );
        }

        Ok(Self {
            name: shared.name,
            file,
            size: metadata.len(),
            content_type: content_type(&shared.path),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The `200 OK` head sent before the file body.
    pub fn response_head(&self) -> HttpResponse {
        HttpResponse::new(StatusCode::Ok)
            .with_content_type(self.content_type.clone())
            .with_header("Content-Length", self.size.to_string())
            .with_header("Content-Disposition", content_disposition(&self.name))
    }

    /// Send the head and the whole file, returning the bytes of body sent.
    ///
    /// Once the head is out there is no way to report a failure to the
    /// client; an error here means the connection must simply be dropped.
    pub async fn send<W>(mut self, socket: &mut W) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        socket.write_all(&self.response_head().head_bytes()).await?;

        let mut body = (&mut self.file).take(self.size);
        let sent = tokio::io::copy(&mut body, socket).await?;
        if sent != self.size {
            return Err(Error::IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("'{}' ended after {sent} of {} bytes", self.name, self.size),
            )));
        }
        socket.flush().await?;
        Ok(sent)
    }
}

/// `Content-Type` for a file, from its extension.
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

/// `Content-Disposition` naming `name` twice.
///
/// `filename*` carries the percent-encoded UTF-8 name; `filename` is a
/// fallback for clients that ignore the extended form.
pub fn content_disposition(name: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}; filename=\"{}\"",
        urlencoding::encode(name),
        fallback_filename(name)
    )
}

/// The plain name when it is printable ASCII, otherwise one RFC 2047
/// base64 encoded word.
fn fallback_filename(name: &str) -> String {
    if name.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
        name.replace('\\', "\\\\").replace('"', "\\\"")
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(name))
    }
}

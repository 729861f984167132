use std::io::{Read, Write};
use std::time::Duration;

use tracing::trace;
use ureq::Agent;

use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// HTTP(S) access needed by the manifest fetcher and the downloader.
pub trait Transport: Send + Sync {
    /// Fetch a whole document into memory.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// `Content-Length` reported by a HEAD request, if any.
    fn content_length(&self, url: &str) -> Result<Option<u64>>;

    /// Stream the body of `url` into `sink`, calling `on_chunk` with the size of
    /// every chunk written. Returns the number of bytes written.
    fn download(&self, url: &str, sink: &mut dyn Write, on_chunk: &dyn Fn(u64)) -> Result<u64>;
}

pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// `timeout` bounds connecting and waiting for response headers. Reading
    /// the body is unbounded so long transfers that keep moving complete.
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(None)
            .timeout_connect(Some(timeout))
            .timeout_send_request(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(None)
            .build()
            .into();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| Error::network(url, e))?;
        let mut data = Vec::new();
        resp.into_body()
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|e| Error::network(url, e))?;
        trace!("Fetched {} bytes from {}", data.len(), url);
        Ok(data)
    }

    fn content_length(&self, url: &str) -> Result<Option<u64>> {
        let resp = self
            .agent
            .head(url)
            .call()
            .map_err(|e| Error::network(url, e))?;
        let length = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|len| *len > 0);
        Ok(length)
    }

    fn download(&self, url: &str, sink: &mut dyn Write, on_chunk: &dyn Fn(u64)) -> Result<u64> {
        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| Error::network(url, e))?;
        let mut reader = resp.into_body().into_reader();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| Error::network(url, e))?;
            if n == 0 {
                break;
            }
            sink.write_all(&buffer[..n])?;
            written += n as u64;
            on_chunk(n as u64);
        }
        sink.flush()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn read_request(stream: &mut TcpStream) {
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            match stream.read(&mut byte) {
                Ok(0) | Err(_) => return,
                Ok(_) => request.push(byte[0]),
            }
        }
    }

    /// Serves one request: headers straight away, then `body` one byte per `gap`.
    fn trickle_server(body: &'static [u8], gap: Duration) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v.mov", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            for byte in body {
                thread::sleep(gap);
                if stream.write_all(&[*byte]).is_err() {
                    return;
                }
                let _ = stream.flush();
            }
        });
        (url, handle)
    }

    #[test]
    fn test_slow_steady_body_outlives_timeout() {
        let (url, server) = trickle_server(b"0123456789", Duration::from_millis(300));
        let transport = UreqTransport::new(Duration::from_secs(2));

        let mut sink = Vec::new();
        let written = transport.download(&url, &mut sink, &|_| {}).unwrap();

        assert_eq!(written, 10);
        assert_eq!(sink, b"0123456789");
        server.join().unwrap();
    }

    #[test]
    fn test_missing_response_headers_time_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v.mov", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&mut stream);
            thread::sleep(Duration::from_secs(2));
        });
        let transport = UreqTransport::new(Duration::from_millis(300));

        let mut sink = Vec::new();
        let result = transport.download(&url, &mut sink, &|_| {});

        assert!(matches!(result, Err(Error::Network { .. })));
        assert!(sink.is_empty());
        server.join().unwrap();
    }
}

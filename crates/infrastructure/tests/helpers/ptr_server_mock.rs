#![allow(dead_code)]
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

/// What the mock server answers to every PTR query.
#[derive(Clone, Debug)]
pub enum PtrAnswer {
    /// NOERROR with one PTR record per name, in order.
    Names(Vec<&'static str>),
    /// NOERROR with an empty answer section.
    Empty,
    /// NXDOMAIN.
    NxDomain,
}

/// UDP nameserver on loopback answering PTR queries with a fixed reply.
pub struct MockPtrServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockPtrServer {
    pub async fn start(answer: PtrAnswer) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = socket.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            if let Some(response) = Self::build_response(&buf[..len], &answer) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Echoes the question and appends the configured answers. Additional
    /// records of the query (EDNS) are dropped.
    fn build_response(query: &[u8], answer: &PtrAnswer) -> Option<Vec<u8>> {
        let question_end = Self::question_end(query)?;

        let mut response = Vec::with_capacity(512);
        response.extend_from_slice(&query[0..2]);

        // QR, opcode copied, RD copied, RA set.
        response.push(0x80 | (query[2] & 0x79));
        response.push(match answer {
            PtrAnswer::NxDomain => 0x83,
            _ => 0x80,
        });

        let names: &[&str] = match answer {
            PtrAnswer::Names(names) => names,
            _ => &[],
        };

        response.extend_from_slice(&[0x00, 0x01]);
        response.extend_from_slice(&(names.len() as u16).to_be_bytes());
        response.extend_from_slice(&[0x00, 0x00]);
        response.extend_from_slice(&[0x00, 0x00]);

        response.extend_from_slice(&query[12..question_end]);

        for name in names {
            let rdata = encode_name(name);
            response.extend_from_slice(&[
                0xc0, 0x0c,
                0x00, 0x0c,
                0x00, 0x01,
                0x00, 0x00, 0x00, 0x3c,
            ]);
            response.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            response.extend_from_slice(&rdata);
        }

        Some(response)
    }

    /// Offset just past QNAME, QTYPE and QCLASS of the first question.
    fn question_end(query: &[u8]) -> Option<usize> {
        let mut offset = 12;
        loop {
            let len = *query.get(offset)? as usize;
            offset += 1;
            if len == 0 {
                break;
            }
            offset += len;
        }
        let end = offset + 4;
        (end <= query.len()).then_some(end)
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockPtrServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(name.len() + 2);
    for label in name.trim_end_matches('.').split('.') {
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr_query() -> Vec<u8> {
        let mut query = vec![
            0xab, 0xcd,
            0x01, 0x00,
            0x00, 0x01,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        query.extend_from_slice(&encode_name("1.2.0.192.in-addr.arpa."));
        query.extend_from_slice(&[0x00, 0x0c, 0x00, 0x01]);
        query
    }

    #[test]
    fn test_response_echoes_question_and_counts_answers() {
        let query = ptr_query();
        let answer = PtrAnswer::Names(vec!["a.example.", "b.example."]);

        let response = MockPtrServer::build_response(&query, &answer).unwrap();

        assert_eq!(response[0..2], [0xab, 0xcd]);
        assert_eq!(response[2] & 0x80, 0x80);
        assert_eq!(response[6..8], [0x00, 0x02]);
        assert_eq!(response[12..query.len()], query[12..]);
    }

    #[test]
    fn test_nxdomain_sets_rcode() {
        let response = MockPtrServer::build_response(&ptr_query(), &PtrAnswer::NxDomain).unwrap();

        assert_eq!(response[3] & 0x0f, 3);
        assert_eq!(response[6..8], [0x00, 0x00]);
    }

    #[test]
    fn test_truncated_query_is_ignored() {
        assert!(MockPtrServer::build_response(&[0u8; 14], &PtrAnswer::Empty).is_none());
    }
}

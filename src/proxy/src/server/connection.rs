use crate::executor::{Executor, QueryOutcome};
use crate::protocol::mysql::basic::{
    client_handshake_response, from_packet, read_length_encoded_number, Command, HandshakeResponse,
    OkPacket,
};
use crate::protocol::mysql::packet::packet_reader::PacketReader;
use crate::protocol::mysql::packet::packet_writer::PacketWriter;
use crate::protocol::mysql::packet::writers::{self, write_ok_packet_with_client_flags};
use crate::ratelimit::{RateLimiter, Verdict};
use crate::server::auth::gen_scramble;
use crate::server::cmd_handler::CmdHandler;
use crate::server::response::write_result_set;
use crate::server::{default_capabilities, SERVER_VERSION};
use crate::sql::{self, Classification};
use crate::store::BackingStore;

use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};
use winnow::error::ErrMode;

static CONN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One prepared statement: the SQL text with `?` placeholders and how many
/// parameters it expects.
struct PreparedStatement {
    sql: String,
    param_count: usize,
}

/// Implements [`CmdHandler`] against the rate limiter, classifier and
/// executor instead of a real MySQL backend.
pub struct MiniMysqlHandler {
    client_ip: String,
    current_db: String,
    store: Arc<dyn BackingStore>,
    limiter: Arc<RateLimiter>,
    executor: Arc<Executor>,
    prepared: HashMap<u32, PreparedStatement>,
    next_stmt_id: u32,
}

impl MiniMysqlHandler {
    pub fn new(
        client_ip: String,
        store: Arc<dyn BackingStore>,
        limiter: Arc<RateLimiter>,
        executor: Arc<Executor>,
    ) -> Self {
        Self {
            client_ip,
            current_db: "mysql".to_string(),
            store,
            limiter,
            executor,
            prepared: HashMap::new(),
            next_stmt_id: 1,
        }
    }

    async fn handle_query<W: AsyncWrite + Unpin>(
        &mut self,
        sql: &str,
        pkt_writer: &mut PacketWriter<W>,
    ) -> io::Result<()> {
        let start = Instant::now();

        if matches!(self.limiter.check(&*self.store, &self.client_ip).await, Verdict::Throttled) {
            return write_result_set(
                pkt_writer,
                default_capabilities(),
                &crate::schema::rejected_columns(),
                &[],
            )
            .await;
        }

        let classification = sql::classify(sql);
        let query_type = classification_name(&classification);
        let outcome = self
            .executor
            .execute(classification, &self.current_db, &self.client_ip)
            .await;

        let duration_ms = start.elapsed().as_millis();
        match &outcome {
            QueryOutcome::Rows { rows, .. } => {
                info!(
                    query_type,
                    table = "users",
                    duration_ms,
                    rows = rows.len(),
                    client = %self.client_ip,
                    result = "ok",
                    "query_executed"
                );
                write_result_set(pkt_writer, default_capabilities(), &outcome_columns(&outcome), rows).await
            }
            QueryOutcome::Ok => {
                info!(
                    query_type,
                    table = "users",
                    duration_ms,
                    rows = 0,
                    client = %self.client_ip,
                    result = "ok",
                    "query_executed"
                );
                write_ok_packet_with_client_flags(pkt_writer, default_capabilities(), OkPacket::default())
                    .await
            }
        }
    }
}

fn classification_name(c: &Classification) -> &'static str {
    match c {
        Classification::Version => "version",
        Classification::ShowTables => "show_tables",
        Classification::DescribeUsers => "describe_users",
        Classification::PkLookup { .. } => "pk_lookup",
        Classification::FullScan { .. } => "full_scan",
        Classification::TokenVerify { .. } => "token_verify",
        Classification::Noop => "noop",
        Classification::Rejected => "rejected",
    }
}

fn outcome_columns(outcome: &QueryOutcome) -> Vec<crate::protocol::mysql::basic::Column> {
    match outcome {
        QueryOutcome::Rows { columns, .. } => columns.clone(),
        QueryOutcome::Ok => vec![],
    }
}

#[async_trait]
impl CmdHandler for MiniMysqlHandler {
    async fn auth(
        &mut self,
        _auth_plugin: &str,
        _user: &[u8],
        _salt: &[u8],
        _auth_data: &[u8],
    ) -> Result<bool, io::Error> {
        // The deployment model is a trusted private network; any
        // credentials are accepted.
        Ok(true)
    }

    async fn on_init<W>(&mut self, database: &[u8], pkt_writer: &mut PacketWriter<W>) -> Result<(), io::Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.current_db = String::from_utf8_lossy(database).to_string();
        write_ok_packet_with_client_flags(pkt_writer, default_capabilities(), OkPacket::default()).await
    }

    async fn on_prepare<W>(&mut self, packet: &[u8], pkt_writer: &mut PacketWriter<W>) -> Result<(), io::Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let sql = String::from_utf8_lossy(packet).to_string();
        let param_count = sql.matches('?').count();
        let stmt_id = self.next_stmt_id;
        self.next_stmt_id += 1;
        self.prepared.insert(
            stmt_id,
            PreparedStatement {
                sql,
                param_count,
            },
        );

        pkt_writer.write_u8(0x00)?;
        pkt_writer.write_u32::<LittleEndian>(stmt_id)?;
        pkt_writer.write_u16::<LittleEndian>(0)?; // num_columns
        pkt_writer.write_u16::<LittleEndian>(param_count as u16)?;
        pkt_writer.write_u8(0x00)?; // filler
        pkt_writer.write_u16::<LittleEndian>(0)?; // warning_count
        pkt_writer.end_packet().await
    }

    async fn on_query<W>(&mut self, packet: &[u8], pkt_writer: &mut PacketWriter<W>) -> Result<(), io::Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let sql = String::from_utf8_lossy(packet).to_string();
        self.handle_query(&sql, pkt_writer).await
    }

    async fn on_execute<W>(
        &mut self,
        stmt: u32,
        params: &[u8],
        pkt_writer: &mut PacketWriter<W>,
    ) -> Result<(), io::Error>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let Some(prepared) = self.prepared.get(&stmt) else {
            warn!(stmt, "execute against unknown statement id");
            return write_ok_packet_with_client_flags(pkt_writer, default_capabilities(), OkPacket::default())
                .await;
        };

        let values = render_params(prepared.param_count, params).unwrap_or_default();
        let sql = substitute_params(&prepared.sql, &values);
        self.handle_query(&sql, pkt_writer).await
    }
}

/// Decodes the binary `COM_STMT_EXECUTE` parameter block (null bitmap,
/// optional type list, then values) into SQL literal text, quoting
/// strings. Returns `None` on any malformed input; callers fall back to
/// leaving `?` placeholders in place, which the classifier then rejects.
fn render_params(param_count: usize, payload: &[u8]) -> Option<Vec<String>> {
    if param_count == 0 {
        return Some(vec![]);
    }
    let null_bitmap_len = param_count.div_ceil(8);
    if payload.len() < null_bitmap_len + 1 {
        return None;
    }
    let null_bitmap = &payload[..null_bitmap_len];
    let mut i = null_bitmap_len;
    let new_params_bound = payload[i];
    i += 1;

    let mut types = Vec::with_capacity(param_count);
    if new_params_bound == 1 {
        for _ in 0..param_count {
            let t = *payload.get(i)?;
            types.push(t);
            i += 2;
        }
    }

    let mut values = Vec::with_capacity(param_count);
    for p in 0..param_count {
        let is_null = (null_bitmap[p / 8] >> (p % 8)) & 1 == 1;
        if is_null {
            values.push("NULL".to_string());
            continue;
        }
        let ty = types.get(p).copied().unwrap_or(0xfd);
        match ty {
            0x01 => {
                let v = *payload.get(i)? as i8;
                i += 1;
                values.push(v.to_string());
            }
            0x02 => {
                let b: [u8; 2] = payload.get(i..i + 2)?.try_into().ok()?;
                i += 2;
                values.push(i16::from_le_bytes(b).to_string());
            }
            0x03 => {
                let b: [u8; 4] = payload.get(i..i + 4)?.try_into().ok()?;
                i += 4;
                values.push(i32::from_le_bytes(b).to_string());
            }
            0x08 => {
                let b: [u8; 8] = payload.get(i..i + 8)?.try_into().ok()?;
                i += 8;
                values.push(i64::from_le_bytes(b).to_string());
            }
            0x04 => {
                let b: [u8; 4] = payload.get(i..i + 4)?.try_into().ok()?;
                i += 4;
                values.push(f32::from_le_bytes(b).to_string());
            }
            0x05 => {
                let b: [u8; 8] = payload.get(i..i + 8)?.try_into().ok()?;
                i += 8;
                values.push(f64::from_le_bytes(b).to_string());
            }
            _ => {
                let slice = payload.get(i..)?;
                let (rest, len) = read_length_encoded_number(slice).ok()?;
                i += slice.len() - rest.len();
                let len = len as usize;
                let raw = payload.get(i..i + len)?;
                i += len;
                let text = String::from_utf8_lossy(raw);
                let escaped = text.replace('\\', "\\\\").replace('\'', "''");
                values.push(format!("'{escaped}'"));
            }
        }
    }
    Some(values)
}

fn substitute_params(sql: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut values = values.iter();
    for ch in sql.chars() {
        if ch == '?' {
            if let Some(v) = values.next() {
                out.push_str(v);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

macro_rules! handshake_err {
    ($handshake_rs:expr) => {{
        $handshake_rs
            .map_err(|e| match e {
                ErrMode::Incomplete(_) => {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "client sent incomplete handshake")
                }
                ErrMode::Backtrack(err) | ErrMode::Cut(err) => io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bad client handshake: {:?} ({:?})", err.input, err.kind),
                ),
            })?
            .1
    }};
}

/// Runs the handshake and command loop for one accepted connection.
/// Commands are processed strictly in receive order: the next packet is
/// not read until the current response has been fully written.
pub async fn serve<R, W>(
    inbound: R,
    outbound: W,
    client_ip: String,
    store: Arc<dyn BackingStore>,
    limiter: Arc<RateLimiter>,
    executor: Arc<Executor>,
) -> io::Result<()>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    let conn_id = CONN_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut pkt_reader = PacketReader::new(inbound);
    let mut pkt_writer = PacketWriter::new(outbound);

    let scramble = gen_scramble();
    writers::write_initial_handshake(&mut pkt_writer, conn_id, scramble, SERVER_VERSION).await?;

    let (seq, handshake_pkt) = pkt_reader.next_async().await?.ok_or_else(|| {
        io::Error::new(io::ErrorKind::ConnectionAborted, "client disconnected before handshake")
    })?;
    let handshake_rs = client_handshake_response(&handshake_pkt);
    let client_handshake: HandshakeResponse = handshake_err!(handshake_rs);
    pkt_writer.set_seq(seq + 1);

    let client_capabilities = client_handshake.client_flag;
    let mut handler = MiniMysqlHandler::new(client_ip.clone(), store, limiter, executor);

    handler
        .auth("mysql_native_password", &client_handshake.db_user_string().into_bytes(), &scramble, &client_handshake.auth_response)
        .await?;

    if let Some(db) = client_handshake.database.as_ref() {
        handler.on_init(db, &mut pkt_writer).await?;
    } else {
        write_ok_packet_with_client_flags(&mut pkt_writer, client_capabilities, OkPacket::default()).await?;
    }
    pkt_writer.flush_all().await?;

    info!(conn_id, client = %client_ip, "connection established");

    while let Some((seq, packet)) = pkt_reader.next_async().await? {
        pkt_writer.set_seq(seq + 1);
        match from_packet(&packet) {
            Ok((_, cmd)) => match cmd {
                Command::Query(sql) => handler.on_query(sql, &mut pkt_writer).await?,
                Command::Prepare(sql) => handler.on_prepare(sql, &mut pkt_writer).await?,
                Command::Execute { stmt, params } => {
                    handler.on_execute(stmt, params, &mut pkt_writer).await?
                }
                Command::Close(_) => {
                    write_ok_packet_with_client_flags(&mut pkt_writer, client_capabilities, OkPacket::default())
                        .await?
                }
                Command::ListFields(_) => {
                    write_ok_packet_with_client_flags(
                        &mut pkt_writer,
                        client_capabilities,
                        OkPacket {
                            header: 0xfe,
                            ..Default::default()
                        },
                    )
                    .await?
                }
                Command::Init(db) => handler.on_init(db, &mut pkt_writer).await?,
                Command::Ping => {
                    write_ok_packet_with_client_flags(&mut pkt_writer, client_capabilities, OkPacket::default())
                        .await?
                }
                Command::Quit => break,
            },
            Err(_) => {
                warn!(conn_id, "dropping connection on protocol framing error");
                break;
            }
        }
        pkt_writer.flush_all().await?;
    }

    info!(conn_id, client = %client_ip, "connection closed");
    Ok(())
}

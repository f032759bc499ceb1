use crate::protocol::mysql::packet::packet_writer::PacketWriter;
use tokio::io::AsyncWrite;

/// Implemented once, by [`crate::server::connection::MiniMysqlHandler`]. Kept
/// as a trait — as the wire-protocol layer does — so the command loop in
/// `on_cmd` never has to know about rate limiting, classification, or redis.
#[async_trait::async_trait]
pub trait CmdHandler: Send + Sync {
    async fn auth(
        &mut self,
        auth_plugin: &str,
        user: &[u8],
        salt: &[u8],
        auth_data: &[u8],
    ) -> Result<bool, std::io::Error>;

    async fn on_init<W>(
        &mut self,
        database: &[u8],
        pkt_writer: &mut PacketWriter<W>,
    ) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Send + Unpin;

    async fn on_prepare<W>(
        &mut self,
        packet: &[u8],
        pkt_writer: &mut PacketWriter<W>,
    ) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Send + Unpin;

    async fn on_query<W>(
        &mut self,
        packet: &[u8],
        pkt_writer: &mut PacketWriter<W>,
    ) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Send + Unpin;

    async fn on_execute<W>(
        &mut self,
        stmt: u32,
        params: &[u8],
        pkt_writer: &mut PacketWriter<W>,
    ) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Send + Unpin;
}

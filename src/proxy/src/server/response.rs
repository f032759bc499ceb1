use crate::protocol::mysql::basic::{Column, OkPacket};
use crate::protocol::mysql::packet::packet_writer::PacketWriter;
use crate::protocol::mysql::packet::writers::{write_column_definitions, write_eof_packet, write_ok_packet_with_client_flags};
use mysql_common::constants::{CapabilityFlags, StatusFlags};
use mysql_common::io::WriteMysqlExt;
use std::io::{self, Write};
use tokio::io::AsyncWrite;

/// Writes a full text-protocol result set: column count, column
/// definitions, one packet per row, and the terminator the client's
/// capabilities call for.
pub async fn write_result_set<W: AsyncWrite + Unpin>(
    w: &mut PacketWriter<W>,
    capabilities: CapabilityFlags,
    columns: &[Column],
    rows: &[Vec<Option<String>>],
) -> io::Result<()> {
    write_column_definitions(columns, w, capabilities).await?;

    for row in rows {
        for value in row {
            match value {
                Some(s) => {
                    w.write_lenenc_str(s.as_bytes())?;
                }
                None => {
                    w.write_all(&[0xfb])?;
                }
            }
        }
        w.end_packet().await?;
    }

    if capabilities.contains(CapabilityFlags::CLIENT_DEPRECATE_EOF) {
        write_ok_packet_with_client_flags(
            w,
            capabilities,
            OkPacket {
                header: 0xfe,
                status_flags: StatusFlags::SERVER_STATUS_AUTOCOMMIT,
                ..Default::default()
            },
        )
        .await
    } else {
        write_eof_packet(w, StatusFlags::SERVER_STATUS_AUTOCOMMIT).await
    }
}

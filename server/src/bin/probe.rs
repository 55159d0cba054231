use bincode::{deserialize, serialize};
use clap::Parser;
use shared::{Packet, ReportRequest, DEFAULT_PAGE_LIMIT, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Sends one report, then pages through the leaderboard and prints the replies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to probe
    #[arg(short = 's', long, default_value = "127.0.0.1:1337")]
    server: String,

    /// Identifier to report as
    #[arg(short = 'i', long)]
    user_id: String,

    /// Requested display name
    #[arg(short = 'u', long, default_value = shared::DEFAULT_USERNAME)]
    username: String,

    /// Elapsed session time in seconds
    #[arg(short = 'e', long, default_value = "0.0")]
    elapsed: f64,

    /// Mark the report as the last one of the session
    #[arg(short = 'c', long)]
    closing: bool,
}

async fn exchange(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    packet: &Packet,
) -> Result<Packet, Box<dyn std::error::Error>> {
    socket.send_to(&serialize(packet)?, server_addr).await?;

    let mut buf = [0u8; MAX_PACKET_SIZE];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await??;
    Ok(deserialize::<Packet>(&buf[0..len])?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let server_addr = args.server.parse::<SocketAddr>()?;
    println!("Probing {} from {}", server_addr, socket.local_addr()?);

    let report = Packet::Report(
        ReportRequest::new(args.user_id, args.username, args.elapsed).closing(args.closing),
    );
    match exchange(&socket, server_addr, &report).await? {
        Packet::ReportAccepted { username, total } => {
            println!("Accepted as {} (total {:.1}s)", username, total)
        }
        Packet::Rejected { reason } => println!("Rejected: {}", reason),
        other => println!("Unexpected reply: {:?}", other),
    }

    let mut offset = 0;
    loop {
        let request = Packet::LeaderboardRequest {
            offset,
            limit: DEFAULT_PAGE_LIMIT,
        };
        match exchange(&socket, server_addr, &request).await? {
            Packet::Leaderboard {
                offset: page_offset,
                total,
                entries,
            } => {
                for (i, entry) in entries.iter().enumerate() {
                    println!(
                        "{:>3}. {:<24} {:>10.1}s {}",
                        page_offset as usize + i + 1,
                        entry.username,
                        entry.elapsed,
                        if entry.online { "online" } else { "" }
                    );
                }
                offset = page_offset + entries.len() as u32;
                if entries.is_empty() || offset >= total {
                    break;
                }
            }
            other => {
                println!("Unexpected reply: {:?}", other);
                break;
            }
        }
    }

    Ok(())
}

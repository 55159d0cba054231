//! Server network layer handling UDP communications for the tracker

use crate::tracker::Tracker;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{LeaderboardEntry, Packet, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Reason sent for datagrams that are not a request the server understands
pub const BAD_REQUEST_REASON: &str = "bad request";

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Malformed { addr: SocketAddr },
    Shutdown,
}

/// Messages sent from main server loop to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Stops a running `Server` from another task
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Cuts one page out of the full board
///
/// The page holds at most `limit` entries starting at `offset`, and stops
/// early so the encoded reply never exceeds `MAX_PACKET_SIZE`.
pub fn leaderboard_page(board: Vec<LeaderboardEntry>, offset: u32, limit: u32) -> Packet {
    let total = u32::try_from(board.len()).unwrap_or(u32::MAX);

    let empty = Packet::Leaderboard {
        offset,
        total,
        entries: Vec::new(),
    };
    let mut size = bincode::serialized_size(&empty).unwrap_or(u64::MAX);

    let mut entries = Vec::new();
    for entry in board
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
    {
        size = size.saturating_add(bincode::serialized_size(&entry).unwrap_or(u64::MAX));
        if size > MAX_PACKET_SIZE as u64 {
            break;
        }
        entries.push(entry);
    }

    Packet::Leaderboard {
        offset,
        total,
        entries,
    }
}

/// Turns one request packet into its response
///
/// Response packets arriving at the server are answered as bad requests.
pub fn respond(tracker: &Tracker, packet: Packet, addr: SocketAddr) -> Packet {
    match packet {
        Packet::Report(request) => match tracker.report(&request) {
            Ok(receipt) => Packet::ReportAccepted {
                username: receipt.username,
                total: receipt.total,
            },
            Err(e) => Packet::Rejected {
                reason: e.to_string(),
            },
        },
        Packet::LeaderboardRequest { offset, limit } => {
            leaderboard_page(tracker.leaderboard(), offset, limit)
        }
        _ => {
            warn!("Unexpected packet type from {}", addr);
            Packet::Rejected {
                reason: BAD_REQUEST_REASON.to_string(),
            }
        }
    }
}

/// UDP front end for a shared `Tracker`
pub struct Server {
    socket: Arc<UdpSocket>,
    tracker: Arc<Tracker>,
    stats_interval: Duration,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tracker: Arc<Tracker>,
        stats_interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            tracker,
            stats_interval,
            tasks: Vec::new(),
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let message = match deserialize::<Packet>(&buffer[0..len]) {
                            Ok(packet) => ServerMessage::PacketReceived { packet, addr },
                            Err(e) => {
                                warn!("Failed to deserialize packet from {}: {}", addr, e);
                                ServerMessage::Malformed { addr }
                            }
                        };

                        if let Err(e) = server_tx.send(message) {
                            error!("Failed to send packet to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut outbound_rx =
            std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        }));
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self
            .outbound_tx
            .send(OutboundMessage::SendPacket { packet, addr })
        {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn log_stats(&self) {
        let stats = self.tracker.stats();
        debug!(
            "{} accounts registered, {} online",
            stats.accounts, stats.online
        );
    }

    /// Main server loop: answers requests until shut down
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let mut stats_interval = interval(self.stats_interval);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            let response = respond(&self.tracker, packet, addr);
                            self.send_packet(response, addr);
                        },
                        Some(ServerMessage::Malformed { addr }) => {
                            let response = Packet::Rejected {
                                reason: BAD_REQUEST_REASON.to_string(),
                            };
                            self.send_packet(response, addr);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = stats_interval.tick() => {
                    self.log_stats();
                },
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }

        Ok(())
    }
}

//! Room actor: an isolated Tokio task that owns one game instance.
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc command channel, so every mutation of a room's state is
//! processed one command at a time. Two near-simultaneous joins can never
//! both slip past the capacity check, and a reap can never race a join:
//! both travel through the same mailbox.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use coil_protocol::{Player, PlayerId, RoomCode, SegmentPoint, ServerEvent};
use tokio::sync::{mpsc, oneshot};

use crate::player::spawn_player;
use crate::{RoomConfig, RoomError};

/// Channel sender delivering outbound events to one member's connection
/// task. Unbounded: fan-out inside the actor must never block on a slow
/// consumer.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// An in-game report a member asks its room to fan out.
///
/// One variant per gameplay client event; the session layer maps inbound
/// traffic onto these so the actor never sees lobby plumbing. The server
/// relays all of it without validation, per the trust-the-client
/// contract.
#[derive(Debug, Clone)]
pub enum GameplayEvent {
    /// Pose/stat report. Relayed to everyone EXCEPT the reporter.
    Update {
        x: f64,
        y: f64,
        angle: f64,
        segments: Vec<SegmentPoint>,
        length: f64,
        score: f64,
    },

    /// Food claim plus its client-generated replacement. Echoed to all.
    FoodEaten {
        food_index: u32,
        new_food: serde_json::Value,
    },

    /// Powerup claim. Echoed to all.
    PowerupPickup { powerup_index: u32 },

    /// Death report with the final trail. Echoed to all.
    Died {
        segments: Vec<SegmentPoint>,
        x: f64,
        y: f64,
    },

    /// Duel challenge against another member. Echoed to all.
    DuelChallenge { opponent_id: PlayerId },

    /// Client-arbitrated duel verdict. Echoed to all.
    DuelResult {
        winner_id: PlayerId,
        loser_id: PlayerId,
    },
}

/// What a successful create or join hands back, feeding the
/// `roomCreated`/`roomJoined` acknowledgement.
#[derive(Debug, Clone)]
pub struct RoomWelcome {
    pub code: RoomCode,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub max_players: usize,
}

/// Result of a leave, driving registry-side cleanup.
#[derive(Debug, Clone, Copy)]
pub struct LeaveOutcome {
    /// False when the player was not a member; leave is idempotent.
    pub removed: bool,
    /// True when no members remain and the room must be destroyed.
    pub now_empty: bool,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub player_count: usize,
    pub max_players: usize,
    pub game_started: bool,
}

/// Commands sent to a room actor through its channel. Request/reply
/// variants carry a oneshot the actor answers on.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        username: String,
        color: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<RoomWelcome, RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<LeaveOutcome>,
    },
    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Relay {
        player_id: PlayerId,
        event: GameplayEvent,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Reap {
        idle_after: Duration,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone; the registry holds one per room, and each member's
/// session caches one so the relay hot path never touches the registry.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's canonical code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Asks the room to admit a player.
    pub async fn join(
        &self,
        player_id: PlayerId,
        username: String,
        color: String,
        sender: PlayerSender,
    ) -> Result<RoomWelcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                player_id,
                username,
                color,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Removes a player, reporting whether the room emptied.
    pub async fn leave(
        &self,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Host-only start request.
    pub async fn start(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Start {
                player_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Hands a gameplay report to the room (fire-and-forget).
    pub async fn relay(
        &self,
        player_id: PlayerId,
        event: GameplayEvent,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Relay { player_id, event })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Requests current room metadata.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Asks the room whether it should be reclaimed. `true` means the
    /// room marked itself closed and the caller must deregister it.
    pub async fn reap(&self, idle_after: Duration) -> Result<bool, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Reap {
                idle_after,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room actor to stop.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    /// Always the id of a present member while members exist.
    host_id: PlayerId,
    /// Insertion order is join order, which is also the host succession
    /// order. Membership stays small (max 8), so linear scans win over an
    /// ordered map.
    players: Vec<Player>,
    /// Per-member outbound channels.
    senders: HashMap<PlayerId, PlayerSender>,
    /// Monotonic: once true, never false again for this room.
    game_started: bool,
    /// Set when the room empties or is reaped; declines any join that
    /// races the registry's removal of the handle.
    closed: bool,
    max_players: usize,
    min_players_to_start: usize,
    created_at: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room = %self.code, host = %self.host_id, "room opened");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    username,
                    color,
                    sender,
                    reply,
                } => {
                    let result =
                        self.handle_join(player_id, username, color, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let _ = reply.send(self.handle_leave(player_id));
                }
                RoomCommand::Start { player_id, reply } => {
                    let _ = reply.send(self.handle_start(player_id));
                }
                RoomCommand::Relay { player_id, event } => {
                    self.handle_relay(player_id, event);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Reap { idle_after, reply } => {
                    let _ = reply.send(self.handle_reap(idle_after));
                }
                RoomCommand::Shutdown => break,
            }
        }

        tracing::info!(room = %self.code, "room closed");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        username: String,
        color: String,
        sender: PlayerSender,
    ) -> Result<RoomWelcome, RoomError> {
        if self.closed {
            return Err(RoomError::NotFound(self.code.clone()));
        }
        if self.game_started {
            return Err(RoomError::GameInProgress(self.code.clone()));
        }
        if self.players.len() >= self.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        if self.member(player_id).is_some() {
            // The session layer blocks double joins; answering with the
            // current welcome keeps a misbehaving caller from ever
            // duplicating the membership entry.
            tracing::warn!(room = %self.code, player = %player_id, "join from existing member");
            return Ok(self.welcome());
        }

        let player = spawn_player(player_id, username, color);
        let new_player_name = player.username.clone();
        self.players.push(player);
        self.senders.insert(player_id, sender);
        tracing::info!(
            room = %self.code,
            player = %player_id,
            players = self.players.len(),
            "player joined"
        );

        // Everyone already present learns about the newcomer; the joiner
        // itself gets the welcome through its reply instead.
        self.broadcast_except(
            player_id,
            ServerEvent::PlayerJoined {
                players: self.snapshot(),
                new_player_id: player_id,
                new_player_name,
            },
        );

        Ok(self.welcome())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> LeaveOutcome {
        let Some(index) =
            self.players.iter().position(|p| p.id == player_id)
        else {
            return LeaveOutcome {
                removed: false,
                now_empty: self.players.is_empty(),
            };
        };

        let departed = self.players.remove(index);
        self.senders.remove(&player_id);

        if self.players.is_empty() {
            self.closed = true;
            tracing::info!(room = %self.code, player = %player_id, "last player left");
            return LeaveOutcome {
                removed: true,
                now_empty: true,
            };
        }

        if self.host_id == player_id {
            // The earliest-joined survivor inherits the room.
            self.host_id = self.players[0].id;
            tracing::info!(room = %self.code, new_host = %self.host_id, "host migrated");
        }

        tracing::info!(
            room = %self.code,
            player = %player_id,
            players = self.players.len(),
            "player left"
        );

        self.broadcast(ServerEvent::PlayerLeft {
            id: departed.id,
            username: departed.username,
            players: self.snapshot(),
            new_host_id: self.host_id,
        });

        LeaveOutcome {
            removed: true,
            now_empty: false,
        }
    }

    fn handle_start(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.closed {
            // A cached handle can outlive the reap; the room is gone as
            // far as callers are concerned.
            return Err(RoomError::NotFound(self.code.clone()));
        }
        if player_id != self.host_id {
            return Err(RoomError::NotHost(player_id));
        }
        if self.players.len() < self.min_players_to_start {
            return Err(RoomError::NotEnoughPlayers(self.min_players_to_start));
        }
        if self.game_started {
            // Monotonic flag: a second start changes nothing and is not
            // re-broadcast.
            return Ok(());
        }

        self.game_started = true;
        tracing::info!(
            room = %self.code,
            players = self.players.len(),
            "game started"
        );
        self.broadcast(ServerEvent::GameStarted {
            players: self.snapshot(),
        });
        Ok(())
    }

    fn handle_relay(&mut self, player_id: PlayerId, event: GameplayEvent) {
        if self.closed {
            return;
        }
        if self.member(player_id).is_none() {
            tracing::warn!(
                room = %self.code,
                player = %player_id,
                "event from non-member, ignoring"
            );
            return;
        }

        match event {
            GameplayEvent::Update {
                x,
                y,
                angle,
                segments,
                length,
                score,
            } => {
                // Pose reports only count while the game runs and the
                // reporter is alive; anything else is stale and dropped.
                if !self.game_started {
                    return;
                }
                let Some(player) = self.member_mut(player_id) else {
                    return;
                };
                if !player.alive {
                    return;
                }
                player.x = x;
                player.y = y;
                player.angle = angle;
                player.segments = segments.clone();
                player.length = length;
                player.score = score;

                self.broadcast_except(
                    player_id,
                    ServerEvent::PlayerMoved {
                        id: player_id,
                        x,
                        y,
                        angle,
                        segments,
                        length,
                        score,
                    },
                );
            }
            GameplayEvent::FoodEaten {
                food_index,
                new_food,
            } => {
                self.broadcast(ServerEvent::FoodEaten {
                    food_index,
                    eaten_by: player_id,
                    new_food,
                });
            }
            GameplayEvent::PowerupPickup { powerup_index } => {
                self.broadcast(ServerEvent::PowerupPickup {
                    powerup_index,
                    picked_by: player_id,
                });
            }
            GameplayEvent::Died { segments, x, y } => {
                let Some(player) = self.member_mut(player_id) else {
                    return;
                };
                player.alive = false;
                let username = player.username.clone();
                tracing::debug!(room = %self.code, player = %player_id, "player died");

                self.broadcast(ServerEvent::PlayerDied {
                    id: player_id,
                    username,
                    segments,
                    x,
                    y,
                });
            }
            GameplayEvent::DuelChallenge { opponent_id } => {
                self.broadcast(ServerEvent::DuelChallenge {
                    challenger_id: player_id,
                    opponent_id,
                });
            }
            GameplayEvent::DuelResult {
                winner_id,
                loser_id,
            } => {
                self.broadcast(ServerEvent::DuelResult {
                    winner_id,
                    loser_id,
                });
            }
        }
    }

    fn handle_reap(&mut self, idle_after: Duration) -> bool {
        let idle =
            !self.game_started && self.created_at.elapsed() > idle_after;
        if self.players.is_empty() || idle {
            self.closed = true;
            return true;
        }
        false
    }

    fn member(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn member_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Value-copy of the membership in join order.
    fn snapshot(&self) -> Vec<Player> {
        self.players.clone()
    }

    fn welcome(&self) -> RoomWelcome {
        RoomWelcome {
            code: self.code.clone(),
            host_id: self.host_id,
            players: self.snapshot(),
            max_players: self.max_players,
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for player in &self.players {
            self.send_to(player.id, event.clone());
        }
    }

    /// Fan-out for events the reporter must not receive back.
    fn broadcast_except(&self, excluded: PlayerId, event: ServerEvent) {
        for player in &self.players {
            if player.id != excluded {
                self.send_to(player.id, event.clone());
            }
        }
    }

    /// Sends one event to one member. Silently drops when the receiver is
    /// gone (member mid-disconnect).
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            player_count: self.players.len(),
            max_players: self.max_players,
            game_started: self.game_started,
        }
    }
}

/// Spawns a room actor seeded with its host and returns the handle plus
/// the creation welcome.
///
/// Construction cannot fail: the host always fits in an empty room, and
/// the code was allocated fresh by the caller.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    host: Player,
    host_sender: PlayerSender,
    channel_size: usize,
) -> (RoomHandle, RoomWelcome) {
    let (tx, rx) = mpsc::channel(channel_size);

    let host_id = host.id;
    let mut senders = HashMap::new();
    senders.insert(host_id, host_sender);

    let actor = RoomActor {
        code: code.clone(),
        host_id,
        players: vec![host],
        senders,
        game_started: false,
        closed: false,
        max_players: config.max_players,
        min_players_to_start: config.min_players_to_start,
        created_at: Instant::now(),
        receiver: rx,
    };
    let welcome = actor.welcome();

    tokio::spawn(actor.run());

    (RoomHandle { code, sender: tx }, welcome)
}

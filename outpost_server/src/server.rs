// TCP server and main event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per client): call `framing::read_frame()` in a
//   loop, deserialize `ClientMessage`, and send `InternalEvent::MessageFrom`
//   to the main thread. On error/EOF, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session`, receives events from the channel,
//   and dispatches them. Uses `recv_timeout` with the configured tick as the
//   timeout — when the timeout fires (no events waiting), it advances the
//   session clock. This gives us a simple timer without a separate timer
//   thread.
//
// The main thread is the only writer to client TCP streams (via the
// session's registry). Reader threads only read from streams. This avoids
// concurrent read/write on the same `TcpStream`, which is safe on most
// platforms but fragile.
//
// A malformed frame or unparseable message terminates only the offending
// connection; its reader reports `Disconnected` and exits. Shutdown: the
// main thread checks a `keep_running` flag (set to false by
// `ServerHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use outpost_protocol::framing::read_frame;
use outpost_protocol::message::ClientMessage;
use outpost_protocol::types::PlayerId;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session::Session;

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        player_id: PlayerId,
        message: ClientMessage,
    },
    Disconnected {
        player_id: PlayerId,
    },
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub fn start_server(config: ServerConfig) -> Result<(ServerHandle, SocketAddr), ServerError> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, mode = ?config.mode, "server listening");
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_server(listener, config, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main event loop. Runs until `keep_running` is set to false.
fn run_server(listener: TcpListener, config: ServerConfig, keep_running: Arc<AtomicBool>) {
    let tick = config.tick;
    let mut rng = rand::rng();
    let mut session = Session::new(config, &mut rng);

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(tick) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Tick timer fired — advance heartbeats, timeouts, resets,
                // and the world clock.
                session.on_tick(Instant::now(), &mut rng);
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom { player_id, message } => {
            session.handle_message(player_id, message);
        }
        InternalEvent::Disconnected { player_id } => {
            session.remove_player(player_id);
        }
    }
}

/// Handle a new TCP connection: register it with the session and spawn a
/// reader thread. The session owns the write half; the reader thread owns a
/// cloned read half.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let read_half = match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    };

    // On capacity the session notifies and drops the stream; no reader is
    // spawned and the clone dies with this scope.
    let Some(player_id) = session.add_player(stream) else {
        return;
    };

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(BufReader::new(read_half), player_id, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    player_id: PlayerId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_frame(&mut reader) {
            Ok(bytes) => match serde_json::from_slice::<ClientMessage>(&bytes) {
                Ok(message) => {
                    let _ = tx.send(InternalEvent::MessageFrom { player_id, message });
                }
                Err(e) => {
                    // Malformed message — disconnect.
                    debug!(player = player_id.0, error = %e, "unparseable message");
                    let _ = tx.send(InternalEvent::Disconnected { player_id });
                    break;
                }
            },
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { player_id });
                break;
            }
        }
    }
}

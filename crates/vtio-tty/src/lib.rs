#![forbid(unsafe_code)]

//! Terminal I/O layer: the output controller, raw-mode guard, window
//! size detection, resize watchers, and the session that ties the
//! decoder, buffer and presenter together.
//!
//! ## Escape Sequence Reference
//!
//! | Feature           | Enable              | Disable             |
//! |-------------------|---------------------|---------------------|
//! | Alternate screen  | `CSI ? 1049 h`      | `CSI ? 1049 l`      |
//! | Mouse tracking    | `CSI ? 1003;1006 h` | `CSI ? 1003;1006 l` |
//! | Focus events      | `CSI ? 1004 h`      | `CSI ? 1004 l`      |
//! | Bracketed paste   | `CSI ? 2004 h`      | `CSI ? 2004 l`      |
//! | Auto-wrap         | `CSI ? 7 h`         | `CSI ? 7 l`         |
//! | Cursor show/hide  | `CSI ? 25 h`        | `CSI ? 25 l`        |

use std::io::{self, Write};

use vtio_core::cursor::{CursorShape, CursorState};
use vtio_core::decoder::InputDecoder;
use vtio_core::event::{InputEvent, TerminalListener};
use vtio_core::geometry::{Position, Size};
use vtio_core::logging::warn;
use vtio_render::ansi;
use vtio_render::buffer::CellBuffer;
use vtio_render::presenter::Presenter;
use vtio_style::{Color, Style};

#[cfg(unix)]
use signal_hook::consts::signal::SIGWINCH;
#[cfg(unix)]
use signal_hook::iterator::Signals;
#[cfg(unix)]
use std::sync::mpsc;

// ── Output controller ────────────────────────────────────────────────

/// Thin escape-writing wrapper over the byte sink.
///
/// Composes sequences from the catalogue in `vtio_render::ansi`; it
/// keeps no state beyond the sink itself.
pub struct TerminalOutput<W: Write> {
    sink: W,
}

impl<W: Write> TerminalOutput<W> {
    /// Wrap a byte sink.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Ring the terminal bell.
    pub fn bell(&mut self) -> io::Result<()> {
        ansi::bell(&mut self.sink)
    }

    /// Set the window title (OSC 0).
    pub fn set_title(&mut self, title: &str) -> io::Result<()> {
        ansi::window_title(&mut self.sink, title)
    }

    /// Set the icon name (OSC 1).
    pub fn set_icon(&mut self, icon: &str) -> io::Result<()> {
        ansi::icon_name(&mut self.sink, icon)
    }

    /// Show or hide the cursor.
    pub fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        ansi::cursor_visible(&mut self.sink, visible)
    }

    /// Set the cursor shape and blink via DECSCUSR.
    pub fn set_cursor_appearance(
        &mut self,
        shape: CursorShape,
        blinking: bool,
    ) -> io::Result<()> {
        let state = CursorState {
            position: Position::ORIGIN,
            shape,
            blinking,
        };
        ansi::cursor_style(&mut self.sink, state.decscusr_param())
    }

    /// Ask the terminal for the cursor position and arm the decoder to
    /// consume the reply.
    pub fn query_cursor_position(&mut self, decoder: &mut InputDecoder) -> io::Result<()> {
        ansi::cursor_position_query(&mut self.sink)?;
        self.sink.flush()?;
        decoder.expect_cursor_report();
        Ok(())
    }

    /// Switch the alternate screen buffer.
    pub fn set_alternate_screen(&mut self, on: bool) -> io::Result<()> {
        ansi::alternate_screen(&mut self.sink, on)
    }

    /// Switch auto-wrap.
    pub fn set_line_wrap(&mut self, on: bool) -> io::Result<()> {
        ansi::line_wrap(&mut self.sink, on)
    }

    /// Switch mouse tracking (any-motion + SGR coordinates).
    pub fn set_mouse_tracking(&mut self, on: bool) -> io::Result<()> {
        ansi::mouse_tracking(&mut self.sink, on)
    }

    /// Switch focus reporting.
    pub fn set_focus_tracking(&mut self, on: bool) -> io::Result<()> {
        ansi::focus_tracking(&mut self.sink, on)
    }

    /// Switch bracketed paste.
    pub fn set_bracketed_paste(&mut self, on: bool) -> io::Result<()> {
        ansi::bracketed_paste(&mut self.sink, on)
    }

    /// Ask the terminal to resize itself (XTWINOPS 8).
    pub fn try_set_size(&mut self, size: Size) -> io::Result<()> {
        ansi::window_size(&mut self.sink, size.height, size.width)
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// The wrapped sink.
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consume the controller, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

// ── Raw mode ─────────────────────────────────────────────────────────

/// RAII guard that saves the original termios and restores it on drop.
///
/// Even if the application panics, the `Drop` impl restores the
/// terminal (unless the panic strategy is `abort`). A restore failure
/// during drop is logged and otherwise ignored.
#[cfg(unix)]
pub struct RawModeGuard {
    original: nix::sys::termios::Termios,
    tty: std::fs::File,
}

#[cfg(unix)]
impl RawModeGuard {
    /// Enter raw mode on the controlling terminal.
    pub fn enter() -> io::Result<Self> {
        let tty = std::fs::File::open("/dev/tty")?;
        let original = nix::sys::termios::tcgetattr(&tty).map_err(io::Error::other)?;

        let mut raw = original.clone();
        nix::sys::termios::cfmakeraw(&mut raw);
        nix::sys::termios::tcsetattr(&tty, nix::sys::termios::SetArg::TCSAFLUSH, &raw)
            .map_err(io::Error::other)?;

        Ok(Self { original, tty })
    }
}

#[cfg(unix)]
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let restored = nix::sys::termios::tcsetattr(
            &self.tty,
            nix::sys::termios::SetArg::TCSAFLUSH,
            &self.original,
        );
        if restored.is_err() {
            warn!("failed to restore terminal modes");
        }
    }
}

// ── Window size ──────────────────────────────────────────────────────

/// Query the controlling terminal's size.
#[cfg(unix)]
pub fn window_size() -> io::Result<Size> {
    let tty = std::fs::File::open("/dev/tty")?;
    let ws = rustix::termios::tcgetwinsize(&tty).map_err(io::Error::other)?;
    if ws.ws_col == 0 || ws.ws_row == 0 {
        return Err(io::Error::other("terminal reported zero size"));
    }
    Ok(Size::new(ws.ws_col, ws.ws_row))
}

// ── Resize watchers ──────────────────────────────────────────────────

/// Signal-driven resize watcher (SIGWINCH).
///
/// A dedicated thread drains the signal iterator and posts one pending
/// notification at a time; storms coalesce because the authoritative
/// size is queried with the ioctl when the notification is consumed.
#[cfg(unix)]
pub struct ResizeWatcher {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
    rx: mpsc::Receiver<()>,
}

#[cfg(unix)]
impl ResizeWatcher {
    /// Install the SIGWINCH handler thread.
    pub fn new() -> io::Result<Self> {
        let mut signals = Signals::new([SIGWINCH]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let (tx, rx) = mpsc::sync_channel(1);
        let thread = std::thread::spawn(move || {
            for _ in signals.forever() {
                let _ = tx.try_send(());
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
            rx,
        })
    }

    /// The new size, if a resize happened since the last call.
    pub fn poll(&self) -> Option<Size> {
        self.rx.try_recv().ok()?;
        window_size().ok()
    }
}

#[cfg(unix)]
impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Poll-based resize tracker for platforms without SIGWINCH.
#[derive(Debug, Clone, Copy)]
pub struct PollingResizeTracker {
    current: Size,
}

impl PollingResizeTracker {
    /// Start tracking from a known size.
    #[must_use]
    pub const fn new(current: Size) -> Self {
        Self { current }
    }

    /// Record an observation; returns the new size when it differs
    /// from the current one.
    pub fn observe(&mut self, size: Size) -> Option<Size> {
        if size != self.current {
            self.current = size;
            return Some(size);
        }
        None
    }
}

// ── Capabilities ─────────────────────────────────────────────────────

/// Terminal features an application can ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    MouseTracking,
    FocusTracking,
    BracketedPaste,
    AlternateScreen,
    CursorShapes,
    WindowTitle,
    WindowResize,
}

/// Whether the xterm-compatible feature set covers a capability.
///
/// Everything here rides on escape sequences the decoder and the
/// catalogue already speak; resize requests are the one feature many
/// emulators refuse.
#[must_use]
pub fn check_support(capability: Capability) -> bool {
    !matches!(capability, Capability::WindowResize)
}

// ── Session ──────────────────────────────────────────────────────────

/// How the session treats the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Plain line-oriented output; the buffer and presenter are idle.
    Logger,
    /// Full-screen cell-addressed rendering.
    Viewport,
}

/// Session configuration.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Initial screen size for the back buffer.
    pub size: Size,
    /// Starting mode.
    pub mode: Mode,
    /// Enter raw mode on attach (needs a controlling terminal).
    pub raw_mode: bool,
    /// Default foreground style for cleared cells.
    pub default_style: Style,
    /// Default background for cleared cells.
    pub default_bg: Color,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            size: Size::new(80, 24),
            mode: Mode::Logger,
            raw_mode: false,
            default_style: Style::default(),
            default_bg: Color::Normal,
        }
    }
}

/// The terminal session: decoder on one side, presenter on the other.
///
/// The session owns the byte sink through its presenter and the input
/// decoder for the byte source; platform code feeds chunks in via
/// [`TerminalSession::process_input`] and drives the paste deadline via
/// [`TerminalSession::pump_paste`].
pub struct TerminalSession<W: Write> {
    presenter: Presenter<W>,
    buffer: CellBuffer,
    decoder: InputDecoder,
    listener: Option<Box<dyn TerminalListener>>,
    mode: Mode,
    size: Size,
    attached: bool,
    #[cfg(unix)]
    raw_guard: Option<RawModeGuard>,
    #[cfg_attr(not(unix), allow(dead_code))]
    want_raw: bool,
}

impl<W: Write> TerminalSession<W> {
    /// Create a session over a byte sink.
    pub fn new(sink: W, options: SessionOptions) -> Self {
        Self {
            presenter: Presenter::new(sink, options.default_style, options.default_bg),
            buffer: CellBuffer::new(options.size, options.default_style, options.default_bg),
            decoder: InputDecoder::new(),
            listener: None,
            mode: options.mode,
            size: options.size,
            attached: false,
            #[cfg(unix)]
            raw_guard: None,
            want_raw: options.raw_mode,
        }
    }

    /// Install the event listener.
    pub fn set_listener(&mut self, listener: Box<dyn TerminalListener>) {
        self.listener = Some(listener);
    }

    /// Attach to the terminal: raw mode (if requested), focus and
    /// paste reporting, and the viewport when in viewport mode.
    ///
    /// # Panics
    ///
    /// Panics when already attached.
    pub fn attach(&mut self) -> io::Result<()> {
        assert!(!self.attached, "session already attached");
        self.attached = true;

        #[cfg(unix)]
        if self.want_raw {
            self.raw_guard = Some(RawModeGuard::enter()?);
        }

        {
            let sink = self.presenter.writer_mut();
            ansi::focus_tracking(sink, true)?;
            ansi::bracketed_paste(sink, true)?;
        }
        if self.mode == Mode::Viewport {
            self.presenter.activate(&mut self.buffer, self.size)?;
        }
        self.presenter.flush()
    }

    /// Detach: restore modes and flush, even if parts of the teardown
    /// fail.
    ///
    /// # Panics
    ///
    /// Panics when not attached.
    pub fn detach(&mut self) -> io::Result<()> {
        assert!(self.attached, "session not attached");
        self.attached = false;

        let mut result = Ok(());
        if self.presenter.is_active() {
            result = result.and(self.presenter.deactivate());
        }
        {
            let sink = self.presenter.writer_mut();
            let restore = ansi::bracketed_paste(sink, false)
                .and_then(|()| ansi::focus_tracking(sink, false));
            if restore.is_err() {
                warn!("failed to restore terminal reporting modes");
            }
        }
        self.decoder.reset();
        #[cfg(unix)]
        {
            self.raw_guard = None;
        }
        result.and(self.presenter.flush())
    }

    /// Switch between logger and viewport mode.
    pub fn set_mode(&mut self, mode: Mode) -> io::Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        self.mode = mode;
        if !self.attached {
            return Ok(());
        }
        match mode {
            Mode::Viewport => self.presenter.activate(&mut self.buffer, self.size),
            Mode::Logger => self.presenter.deactivate(),
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The back buffer, for draw calls.
    pub fn viewport(&mut self) -> &mut CellBuffer {
        &mut self.buffer
    }

    /// The application cursor.
    #[must_use]
    pub fn cursor(&self) -> CursorState {
        self.presenter.cursor()
    }

    /// Move or restyle the application cursor.
    pub fn set_cursor(&mut self, cursor: CursorState) {
        self.presenter.set_cursor(cursor);
    }

    /// Reconcile the terminal with the back buffer.
    pub fn update_screen(&mut self) -> io::Result<()> {
        self.presenter.update(&mut self.buffer)
    }

    /// Ring the bell.
    pub fn bell(&mut self) -> io::Result<()> {
        ansi::bell(self.presenter.writer_mut())
    }

    /// Set the window title.
    pub fn set_title(&mut self, title: &str) -> io::Result<()> {
        ansi::window_title(self.presenter.writer_mut(), title)
    }

    /// Set the icon name.
    pub fn set_icon(&mut self, icon: &str) -> io::Result<()> {
        ansi::icon_name(self.presenter.writer_mut(), icon)
    }

    /// Ask the terminal to resize itself.
    pub fn try_set_size(&mut self, size: Size) -> io::Result<()> {
        ansi::window_size(self.presenter.writer_mut(), size.height, size.width)
    }

    /// Handle a size change: grow the buffer and tell the listener.
    pub fn screen_resized(&mut self, size: Size) {
        self.size = size;
        self.buffer.resize(size);
        if let Some(listener) = self.listener.as_mut() {
            listener.on_screen_resize(size);
        }
    }

    /// Decode a chunk of terminal input and deliver the events.
    pub fn process_input(&mut self, chunk: &[u8]) -> Vec<InputEvent> {
        let events = self.decoder.feed(chunk);
        self.deliver(&events, chunk);
        events
    }

    /// Flush an expired paste accumulation, if any.
    pub fn pump_paste(&mut self) -> Option<InputEvent> {
        let event = self.decoder.poll_paste(std::time::Instant::now())?;
        self.deliver(std::slice::from_ref(&event), b"");
        Some(event)
    }

    /// The decoder, for callers driving it directly.
    pub fn decoder_mut(&mut self) -> &mut InputDecoder {
        &mut self.decoder
    }

    fn deliver(&mut self, events: &[InputEvent], chunk: &[u8]) {
        let Some(listener) = self.listener.as_mut() else {
            return;
        };
        let mut fully_processed = false;
        for event in events {
            match event {
                InputEvent::Key(_)
                | InputEvent::Text(_)
                | InputEvent::Paste(_)
                | InputEvent::Unhandled(_) => listener.on_keyboard_input(event),
                InputEvent::Mouse(mouse) => listener.on_mouse_event(mouse),
                InputEvent::Focus(gained) => listener.on_focus_change(*gained),
                InputEvent::RawProcessed(_) => fully_processed = true,
                InputEvent::CursorReport(_) | InputEvent::DeviceAttributes(_) => {
                    listener.on_keyboard_input(event);
                }
            }
        }
        if !chunk.is_empty() {
            listener.on_raw_input(&String::from_utf8_lossy(chunk), fully_processed);
        }
    }
}

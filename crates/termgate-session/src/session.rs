//! The session: one per connection, driving the stage machine.
//!
//! A session is owned by its connection task and never shared. Everything
//! it shares with other sessions (validator, limiter, store, doors) sits
//! in one [`SessionContext`] behind an `Arc`.
//!
//! Each input line goes through the same gate before the stage sees it:
//!
//! ```text
//! raw line → Validator (as the stage's field kind) → RateLimiter → stage handler
//! ```
//!
//! Validation runs first. A rejected line still counts against the
//! origin's command track.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use termgate_door::{DoorCatalog, DoorGame, DoorId, DoorOutput};
use termgate_guard::{
    FieldKind, LoginVerdict, RateLimiter, Validator, display_len, instant_after,
    sanitize_for_log, truncate_for_log,
};
use termgate_protocol::ServerFrame;
use termgate_store::{CredentialStore, LoginOutcome, NewMessage, Profile, StoreError, User};

use crate::command::{Confirm, DoorsCommand, MainCommand, MessagesCommand};
use crate::screens;
use crate::store_call::{self, StoreScope};
use crate::{
    Area, AuthenticationError, MessageMode, MessageView, RegisterStep, Secret, SessionError,
    Stage, SubMenu,
};

/// How many rows the message and user listings show.
const LISTING_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Per-session timing and limits.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name shown in the banner.
    pub board_name: String,

    /// A session with no input for this long is closed, at any stage.
    ///
    /// Default: 30 minutes.
    pub idle_timeout: Duration,

    /// A peer still authenticating this long after connecting is closed.
    ///
    /// Default: 5 minutes.
    pub login_timeout: Duration,

    /// Wrong passwords allowed on one connection before it is closed.
    /// Independent of the per-origin lockout.
    pub login_retry_cap: u32,

    /// Upper bound on any single store call.
    pub store_timeout: Duration,

    /// Maximum length of a message body, in characters.
    pub message_body_max: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_name: "Termgate BBS".to_string(),
            idle_timeout: Duration::from_secs(30 * 60),
            login_timeout: Duration::from_secs(5 * 60),
            login_retry_cap: 3,
            store_timeout: Duration::from_secs(5),
            message_body_max: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// Everything sessions share. Built once by the server.
pub struct SessionContext {
    pub config: SessionConfig,
    pub validator: Validator,
    pub limiter: Arc<RateLimiter>,
    pub store: Arc<dyn CredentialStore>,
    pub doors: DoorCatalog,
}

impl SessionContext {
    pub fn new(
        config: SessionConfig,
        validator: Validator,
        limiter: Arc<RateLimiter>,
        store: Arc<dyn CredentialStore>,
        doors: DoorCatalog,
    ) -> Self {
        Self {
            config,
            validator,
            limiter,
            store,
            doors,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One connection's state.
pub struct Session {
    ctx: Arc<SessionContext>,
    origin: IpAddr,
    conn_id: u64,
    stage: Stage,
    /// Set once login or registration completes.
    user: Option<User>,
    game: Option<Box<dyn DoorGame>>,
    connected_at: Instant,
    last_activity: Instant,
    /// Wrong passwords on this connection.
    login_attempts: u32,
    frames_emitted: u64,
}

impl Session {
    pub fn new(ctx: Arc<SessionContext>, origin: IpAddr, conn_id: u64) -> Self {
        let now = Instant::now();
        Self {
            ctx,
            origin,
            conn_id,
            stage: Stage::Connecting,
            user: None,
            game: None,
            connected_at: now,
            last_activity: now,
            login_attempts: 0,
            frames_emitted: 0,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn origin(&self) -> IpAddr {
        self.origin
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Disconnecting
    }

    /// The instant after which the session times out if no input arrives.
    ///
    /// The idle bound counts from the last input. While authenticating,
    /// the login bound (counted from connect) applies too.
    pub fn deadline(&self) -> Instant {
        let idle = instant_after(self.last_activity, self.ctx.config.idle_timeout);
        if self.stage.is_authenticating() {
            idle.min(self.login_deadline())
        } else {
            idle
        }
    }

    fn login_deadline(&self) -> Instant {
        instant_after(self.connected_at, self.ctx.config.login_timeout)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Leaves `Connecting`: sends the banner and asks for a username.
    ///
    /// # Errors
    /// `RateLimited` if the origin is locked out. Nothing has been sent to
    /// the peer and the session is already `Disconnecting`.
    pub fn open(&mut self) -> Result<ServerFrame, SessionError> {
        if let Err(err) = self
            .ctx
            .limiter
            .check_connection(self.origin, Instant::now())
        {
            tracing::warn!(origin = %self.origin, conn_id = self.conn_id, %err, "connection refused");
            self.stage = Stage::Disconnecting;
            return Err(err.into());
        }

        self.stage = Stage::AuthUsername;
        tracing::info!(origin = %self.origin, conn_id = self.conn_id, "session opened");
        let banner = screens::banner(&self.ctx.config.board_name);
        Ok(self.emit(banner))
    }

    /// Handles one line of input and returns the frame to send back.
    ///
    /// Once the session is `Disconnecting` every call returns an empty
    /// ended frame.
    pub async fn handle_line(&mut self, raw: &str) -> ServerFrame {
        if self.is_finished() {
            return ServerFrame::new().ended();
        }
        if self.stage == Stage::Connecting {
            return ServerFrame::new();
        }

        let now = Instant::now();
        self.last_activity = now;

        let kind = self.stage.field_kind();
        if kind == FieldKind::Password {
            tracing::debug!(conn_id = self.conn_id, stage = self.stage.name(), "password line received");
        } else {
            tracing::debug!(
                conn_id = self.conn_id,
                stage = self.stage.name(),
                input = %sanitize_for_log(&truncate_for_log(raw, 80)),
                "line received"
            );
        }

        let validated = self.ctx.validator.validate(kind, raw);

        if let Err(err) = self.ctx.limiter.admit_command(self.origin, now) {
            let message = SessionError::from(err).user_message();
            return self.emit(ServerFrame::new().line(message));
        }

        let frame = match validated {
            Ok(input) => self.dispatch(input).await,
            Err(err) => {
                tracing::debug!(conn_id = self.conn_id, %err, "input rejected");
                ServerFrame::new().line(format!("Invalid input: {err}"))
            }
        };
        self.emit(frame)
    }

    /// Ends the session because the deadline passed.
    pub fn on_timeout(&mut self) -> ServerFrame {
        let login_expired = self.stage.is_authenticating()
            && Instant::now() >= self.login_deadline();
        let (reason, message) = if login_expired {
            ("login timeout", "Login timed out. Goodbye.")
        } else {
            ("idle timeout", "Session timed out due to inactivity.")
        };
        self.finish(reason);
        self.emit(ServerFrame::new().line(message).ended())
    }

    /// Answers input the transport or codec refused before it became a
    /// line (oversized, not UTF-8). The stage does not change.
    pub fn reject_input(&mut self, message: &str) -> ServerFrame {
        if self.is_finished() {
            return ServerFrame::new().ended();
        }
        self.last_activity = Instant::now();
        self.emit(ServerFrame::new().line(message))
    }

    /// The peer went away.
    pub fn on_peer_closed(&mut self) {
        self.finish("peer closed");
    }

    fn finish(&mut self, reason: &'static str) {
        if self.is_finished() {
            return;
        }
        if let Some(mut game) = self.game.take() {
            game.on_disconnect();
        }
        self.stage = Stage::Disconnecting;
        tracing::info!(
            origin = %self.origin,
            conn_id = self.conn_id,
            username = self.username(),
            reason,
            frames = self.frames_emitted,
            duration = ?self.connected_at.elapsed(),
            "session closed"
        );
    }

    /// Adds the stage's prompt and password flag, and counts the frame.
    fn emit(&mut self, mut frame: ServerFrame) -> ServerFrame {
        if !frame.session_ended {
            if frame.prompt.is_none() {
                frame.prompt = self.stage.prompt().map(str::to_string);
            }
            frame.password_field = self.stage.password_field();
        }
        self.frames_emitted += 1;
        frame
    }

    fn username(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.username.as_str())
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    async fn dispatch(&mut self, input: String) -> ServerFrame {
        match self.stage.clone() {
            Stage::Connecting | Stage::Disconnecting => ServerFrame::new(),
            Stage::AuthUsername => self.on_username(input).await,
            Stage::AuthPassword { username } => self.on_password(username, input).await,
            Stage::AuthRegisterConfirm { username } => self.on_register_confirm(username, &input),
            Stage::Register { username, step } => self.on_register(username, step, input).await,
            Stage::MenuMain => self.on_main_menu(&input).await,
            Stage::MenuSub(SubMenu::Messages(view)) => self.on_messages(view, input).await,
            Stage::MenuSub(SubMenu::Doors) => self.on_doors(&input),
            Stage::MenuSub(SubMenu::Users | SubMenu::Help) => self.to_main_menu(),
            Stage::GameActive(id) => self.on_game_line(id, &input),
        }
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    async fn on_username(&mut self, username: String) -> ServerFrame {
        let lookup = username.clone();
        match self
            .store_call(move |scope| scope.check()?.find_user(&lookup))
            .await {
            Ok(user) => {
                self.stage = Stage::AuthPassword {
                    username: user.username,
                };
                ServerFrame::new()
            }
            Err(SessionError::Store(StoreError::NotFound)) => {
                let frame = ServerFrame::new().line(format!("User {username} not found."));
                self.stage = Stage::AuthRegisterConfirm { username };
                frame
            }
            Err(err) => self.store_failure("find user", err),
        }
    }

    async fn on_password(&mut self, username: String, password: String) -> ServerFrame {
        let name = username.clone();
        let result = self
            .store_call(move |scope| {
                let store = scope.check()?;
                let user = store.find_user(&name)?;
                if store.verify_password(&user, &password)? {
                    scope.commit()?.record_successful_login(&user).map(Some)
                } else {
                    Ok(None)
                }
            })
            .await;

        match result {
            Ok(Some(user)) => {
                self.login_attempts = 0;
                self.record_attempt(&user.username, LoginOutcome::Success)
                    .await;
                tracing::info!(
                    origin = %self.origin,
                    conn_id = self.conn_id,
                    username = %user.username,
                    login_count = user.login_count,
                    "login succeeded"
                );
                let mut frame = ServerFrame::new()
                    .line("")
                    .line(format!("Welcome back, {}!", user.username))
                    .line(format!("You have logged in {} time(s).", user.login_count));
                self.user = Some(user);
                frame.append(self.to_main_menu());
                frame
            }
            Ok(None) | Err(SessionError::Store(StoreError::NotFound)) => {
                let err = self.login_failed(&username).await;
                let frame = ServerFrame::new().line(err.to_string());
                if err.is_terminal() {
                    self.finish("authentication failed");
                    frame.ended()
                } else {
                    frame
                }
            }
            Err(err) => self.store_failure("verify password", err),
        }
    }

    /// Counts one failed login against the connection and the origin.
    async fn login_failed(&mut self, username: &str) -> AuthenticationError {
        self.login_attempts += 1;
        let cap = self.ctx.config.login_retry_cap;
        let verdict = self
            .ctx
            .limiter
            .record_login_failure(self.origin, Instant::now());

        let (outcome, err) = match verdict {
            LoginVerdict::LockedOut { remaining } => (
                LoginOutcome::Lockout,
                AuthenticationError::LockedOut { remaining },
            ),
            LoginVerdict::Retry { .. } if self.login_attempts >= cap => {
                (LoginOutcome::Failure, AuthenticationError::RetriesExhausted)
            }
            LoginVerdict::Retry { .. } => (
                LoginOutcome::Failure,
                AuthenticationError::WrongPassword {
                    attempts_left: cap - self.login_attempts,
                },
            ),
        };

        tracing::warn!(
            origin = %self.origin,
            conn_id = self.conn_id,
            username = %username,
            attempts = self.login_attempts,
            %outcome,
            "login failed"
        );
        self.record_attempt(username, outcome).await;
        err
    }

    /// Appends to the login history. A failure here is logged, not shown.
    async fn record_attempt(&self, username: &str, outcome: LoginOutcome) {
        let origin = self.origin;
        let name = username.to_string();
        let result = self
            .store_call(move |scope| {
                scope
                    .commit()?
                    .record_login_attempt(origin, &name, outcome)
            })
            .await;
        if let Err(err) = result {
            tracing::error!(conn_id = self.conn_id, %err, "failed to record login attempt");
        }
    }

    fn on_register_confirm(&mut self, username: String, answer: &str) -> ServerFrame {
        match Confirm::parse(answer) {
            Confirm::Yes => {
                self.stage = Stage::Register {
                    username,
                    step: RegisterStep::Password,
                };
                let min = self.ctx.validator.limits().password_min;
                ServerFrame::new().line(format!(
                    "Password: {min}+ characters with upper, lower, digit and special character."
                ))
            }
            Confirm::No => {
                self.stage = Stage::AuthUsername;
                ServerFrame::new()
            }
            Confirm::Unknown => ServerFrame::new().line("Please answer Y or N."),
        }
    }

    async fn on_register(
        &mut self,
        username: String,
        step: RegisterStep,
        input: String,
    ) -> ServerFrame {
        let (next, frame) = match step {
            RegisterStep::Password => match self.ctx.validator.check_password_strength(&input) {
                Ok(()) => (
                    RegisterStep::ConfirmPassword {
                        password: Secret::new(input),
                    },
                    ServerFrame::new(),
                ),
                Err(err) => (
                    RegisterStep::Password,
                    ServerFrame::new().line(format!("Password requirements not met: {err}")),
                ),
            },
            RegisterStep::ConfirmPassword { password } => {
                if password.expose() == input {
                    (RegisterStep::RealName { password }, ServerFrame::new())
                } else {
                    (
                        RegisterStep::Password,
                        ServerFrame::new().line("Passwords do not match. Try again."),
                    )
                }
            }
            RegisterStep::RealName { password } => (
                RegisterStep::Location {
                    password,
                    real_name: non_empty(input),
                },
                ServerFrame::new(),
            ),
            RegisterStep::Location {
                password,
                real_name,
            } => {
                let profile = Profile {
                    real_name,
                    location: non_empty(input),
                };
                return self.create_account(username, password, profile).await;
            }
        };
        self.stage = Stage::Register {
            username,
            step: next,
        };
        frame
    }

    async fn create_account(
        &mut self,
        username: String,
        password: Secret,
        profile: Profile,
    ) -> ServerFrame {
        let name = username.clone();
        let secret = password.clone();
        let fields = profile.clone();
        let result = self
            .store_call(move |scope| {
                let user = scope
                    .check()?
                    .create_user(&name, secret.expose(), &fields)?;
                match scope.commit() {
                    Ok(store) => store.record_successful_login(&user),
                    Err(err) => {
                        if let Err(undo) = scope.rollback().delete_user(&user.username) {
                            tracing::error!(username = %user.username, %undo, "failed to undo registration");
                        }
                        Err(err)
                    }
                }
            })
            .await;

        match result {
            Ok(user) => {
                self.record_attempt(&user.username, LoginOutcome::Success)
                    .await;
                tracing::info!(
                    origin = %self.origin,
                    conn_id = self.conn_id,
                    username = %user.username,
                    "user registered"
                );
                let mut frame = ServerFrame::new()
                    .line("")
                    .line(format!("Registration successful! Welcome, {}!", user.username));
                self.user = Some(user);
                frame.append(self.to_main_menu());
                frame
            }
            Err(SessionError::Store(StoreError::DuplicateUsername)) => {
                self.stage = Stage::AuthUsername;
                ServerFrame::new().line(format!(
                    "The username {username} is already taken. Please choose another."
                ))
            }
            Err(err) => {
                self.stage = Stage::Register {
                    username,
                    step: RegisterStep::Location {
                        password,
                        real_name: profile.real_name,
                    },
                };
                self.store_failure("create user", err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Menus
    // -----------------------------------------------------------------------

    fn to_main_menu(&mut self) -> ServerFrame {
        self.stage = Stage::MenuMain;
        screens::main_menu(self.username())
    }

    async fn on_main_menu(&mut self, command: &str) -> ServerFrame {
        match MainCommand::parse(command) {
            MainCommand::Messages => {
                self.stage = Stage::MenuSub(SubMenu::Messages(MessageView::browse(Area::General)));
                screens::messages_menu(Area::General)
            }
            MainCommand::Doors => {
                self.stage = Stage::MenuSub(SubMenu::Doors);
                screens::doors_menu(&self.ctx.doors)
            }
            MainCommand::Users => {
                match self
                    .store_call(|scope| scope.check()?.list_users(LISTING_LIMIT))
                    .await
                {
                    Ok(users) => {
                        self.stage = Stage::MenuSub(SubMenu::Users);
                        screens::user_list(&users)
                    }
                    Err(err) => self.store_failure("list users", err),
                }
            }
            MainCommand::Help => {
                self.stage = Stage::MenuSub(SubMenu::Help);
                screens::help(self.ctx.config.idle_timeout.as_secs() / 60)
            }
            MainCommand::Time => screens::time_screen(),
            MainCommand::Logoff => {
                let frame = ServerFrame::new()
                    .line("Thank you for using our BBS. Goodbye!")
                    .ended();
                self.finish("logoff");
                frame
            }
            MainCommand::Redisplay => screens::main_menu(self.username()),
            MainCommand::Unknown(command) => {
                ServerFrame::new().line(format!("Invalid command: {command}. Type H for help."))
            }
        }
    }

    fn set_message_view(&mut self, view: MessageView) {
        self.stage = Stage::MenuSub(SubMenu::Messages(view));
    }

    async fn on_messages(&mut self, mut view: MessageView, input: String) -> ServerFrame {
        let area = view.area;
        let frame = match view.mode {
            MessageMode::Browse => match MessagesCommand::parse(&input) {
                MessagesCommand::List => {
                    match self
                        .store_call(move |scope| {
                            scope.check()?.list_messages(area.key(), LISTING_LIMIT)
                        })
                        .await
                    {
                        Ok(messages) => screens::message_list(area, &messages),
                        Err(err) => self.store_failure("list messages", err),
                    }
                }
                MessagesCommand::Read(id) => {
                    match self
                        .store_call(move |scope| scope.check()?.read_message(area.key(), id))
                        .await
                    {
                        Ok(message) => screens::message_detail(&message),
                        Err(SessionError::Store(StoreError::NotFound)) => ServerFrame::new()
                            .line(format!("Message #{id} not found in this area.")),
                        Err(err) => self.store_failure("read message", err),
                    }
                }
                MessagesCommand::Post if area.is_read_only() => ServerFrame::new()
                    .line(format!("The {} area is read-only.", area.title())),
                MessagesCommand::Post => {
                    view.mode = MessageMode::PostSubject;
                    ServerFrame::new().line("Enter a subject, or an empty line to cancel.")
                }
                MessagesCommand::ChangeArea => {
                    view.mode = MessageMode::ChooseArea;
                    screens::area_menu(area)
                }
                MessagesCommand::Back => return self.to_main_menu(),
                MessagesCommand::Redisplay => screens::messages_menu(area),
                MessagesCommand::Unknown(command) => {
                    ServerFrame::new().line(format!("Invalid command: {command}"))
                }
            },
            MessageMode::ChooseArea => {
                let chosen = input.parse::<usize>().ok().and_then(Area::from_number);
                match chosen {
                    Some(next) => {
                        view = MessageView::browse(next);
                        screens::messages_menu(next)
                    }
                    None if input.is_empty() => {
                        view.mode = MessageMode::Browse;
                        screens::messages_menu(area)
                    }
                    None => ServerFrame::new().line("Invalid area."),
                }
            }
            MessageMode::PostSubject => {
                if input.is_empty() {
                    view.mode = MessageMode::Browse;
                    ServerFrame::new().line("Post cancelled.")
                } else {
                    view.mode = MessageMode::PostBody {
                        subject: input,
                        body: Vec::new(),
                    };
                    ServerFrame::new().line(format!(
                        "Enter your message (max {} characters). Type END on a line by itself to post, CANCEL to abort.",
                        self.ctx.config.message_body_max
                    ))
                }
            }
            MessageMode::PostBody { subject, mut body } => {
                match input.trim().to_ascii_uppercase().as_str() {
                    "END" if body.is_empty() => {
                        view.mode = MessageMode::Browse;
                        ServerFrame::new().line("Message is empty. Post cancelled.")
                    }
                    "END" => {
                        view.mode = MessageMode::Browse;
                        self.post_message(area, subject, body.join("\n")).await
                    }
                    "CANCEL" => {
                        view.mode = MessageMode::Browse;
                        ServerFrame::new().line("Post cancelled.")
                    }
                    _ => {
                        let used: usize = body.iter().map(|line| display_len(line) + 1).sum();
                        let frame = if used + display_len(&input)
                            > self.ctx.config.message_body_max
                        {
                            ServerFrame::new().line(format!(
                                "Message too long (max {} characters). Line not added.",
                                self.ctx.config.message_body_max
                            ))
                        } else {
                            body.push(input);
                            ServerFrame::new()
                        };
                        view.mode = MessageMode::PostBody { subject, body };
                        frame
                    }
                }
            }
        };
        self.set_message_view(view);
        frame
    }

    async fn post_message(&mut self, area: Area, subject: String, body: String) -> ServerFrame {
        let from = self.username().to_string();
        let result = self
            .store_call(move |scope| {
                scope.commit()?.post_message(&NewMessage {
                    area: area.key(),
                    from_user: &from,
                    to_user: "All",
                    subject: &subject,
                    body: &body,
                })
            })
            .await;
        match result {
            Ok(id) => {
                tracing::info!(
                    conn_id = self.conn_id,
                    username = self.username(),
                    area = area.key(),
                    id,
                    "message posted"
                );
                ServerFrame::new().line(format!("Message #{id} posted."))
            }
            Err(err) => self.store_failure("post message", err),
        }
    }

    // -----------------------------------------------------------------------
    // Doors
    // -----------------------------------------------------------------------

    fn on_doors(&mut self, command: &str) -> ServerFrame {
        match DoorsCommand::parse(command) {
            DoorsCommand::Launch(number) => {
                let Some(id) = self.ctx.doors.by_number(number).map(|door| door.id.clone())
                else {
                    return ServerFrame::new().line("Invalid selection.");
                };
                match self.ctx.doors.launch(&id) {
                    Ok(mut game) => {
                        tracing::info!(
                            conn_id = self.conn_id,
                            username = self.username(),
                            door = %id,
                            "door launched"
                        );
                        let output = game.start(self.username());
                        self.game = Some(game);
                        self.stage = Stage::GameActive(id);
                        self.door_frame(output)
                    }
                    Err(err) => {
                        let err = SessionError::from(err);
                        tracing::error!(conn_id = self.conn_id, %err, "door launch failed");
                        ServerFrame::new().line(err.user_message())
                    }
                }
            }
            DoorsCommand::Back => self.to_main_menu(),
            DoorsCommand::Redisplay => screens::doors_menu(&self.ctx.doors),
            DoorsCommand::Unknown(_) => ServerFrame::new().line("Invalid selection."),
        }
    }

    fn on_game_line(&mut self, id: DoorId, line: &str) -> ServerFrame {
        let Some(game) = self.game.as_mut() else {
            tracing::warn!(conn_id = self.conn_id, door = %id, "game stage without a game");
            return self.to_main_menu();
        };
        let output = game.handle_line(line);
        self.door_frame(output)
    }

    /// Wraps door output into a frame; a finished door returns to the main
    /// menu in the same frame.
    fn door_frame(&mut self, output: DoorOutput) -> ServerFrame {
        let mut frame = ServerFrame::new().lines(output.lines);
        frame.prompt = output.prompt;
        if output.done {
            self.game = None;
            tracing::info!(conn_id = self.conn_id, username = self.username(), "door finished");
            frame.append(self.to_main_menu());
        }
        frame
    }

    // -----------------------------------------------------------------------
    // Store access
    // -----------------------------------------------------------------------

    /// Runs a store operation on the blocking pool, bounded by the store
    /// timeout. Writes go through [`StoreScope::commit`] so nothing lands
    /// after the session has reported a timeout.
    async fn store_call<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&StoreScope<'_>) -> Result<T, StoreError> + Send + 'static,
    {
        store_call::run(
            Arc::clone(&self.ctx.store),
            self.ctx.config.store_timeout,
            op,
        )
        .await
    }

    /// Logs a store failure in full and gives the peer the generic line.
    fn store_failure(&self, operation: &'static str, err: SessionError) -> ServerFrame {
        if err.is_backend_fault() {
            tracing::error!(
                origin = %self.origin,
                conn_id = self.conn_id,
                operation,
                %err,
                "store operation failed"
            );
        } else {
            tracing::warn!(conn_id = self.conn_id, operation, %err, "store request refused");
        }
        ServerFrame::new().line(err.user_message())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

// ===========================================================================
// Tests
// ===========================================================================

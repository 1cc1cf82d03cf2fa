use crate::{
    Arguments, BucketViewResult, ClipboardToken, DroppedContent, Error, MyStyle, NodeId,
    Notification, ObjectPath, PolarsEngine, Preview, Session, TreeView, activated_file,
    file_dialog,
};

use egui::{
    Align2, CentralPanel, Color32, Context, MenuBar, RichText, ScrollArea, SidePanel, TextEdit,
    TopBottomPanel, ViewportCommand, Window, style::Visuals, warn_if_debug_build, widgets,
};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::oneshot::{self, Receiver, error::TryRecvError};
use tracing::error;

/// Share of the window width taken by the result drawer.
const DRAWER_WIDTH_RATIO: f32 = 0.75;

/// What a background request delivers to the UI thread.
pub enum Outcome {
    /// A session whose discovery query succeeded, with the bucket tree.
    Connected { session: Session, tree: TreeView },
    /// A query result for the drawer.
    Preview(Preview),
}

/// Type alias for a Result with an `Outcome`.
pub type OutcomeResult = BucketViewResult<Outcome>;
/// Type alias for a boxed, dynamically dispatched Future that returns an `OutcomeResult`.
pub type OutcomeFuture = Box<dyn Future<Output = OutcomeResult> + Unpin + Send + 'static>;

/// State of the connect dialog.
#[derive(Debug, Default)]
struct ConnectForm {
    token: String,
    bucket: String,
    /// Shown under the token field (manual-paste instruction).
    hint: Option<&'static str>,
    /// Last connection failure, shown in the dialog.
    error: Option<String>,
}

/// What the central drop zone displays.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DropZone {
    Instructions,
    Processing(String),
    Failed(String),
}

/// The main application struct for Bucket View.
pub struct BucketViewApp {
    /// Directory backing the object store.
    root: PathBuf,
    /// Preview row limit handed to every new session.
    limit: Option<u32>,
    /// `Some` while the connect dialog is open.
    connect: Option<ConnectForm>,
    session: Option<Session>,
    tree: Option<TreeView>,
    selected: Option<NodeId>,
    /// The one preview shown in the drawer.
    preview: Option<Preview>,
    drop_zone: DropZone,
    /// Optional Notification window for errors outside the drop zone.
    notification: Option<Box<dyn Notification>>,

    /// Tokio runtime for asynchronous operations (queries, file reads).
    runtime: tokio::runtime::Runtime,
    /// Receiver of the latest-issued request. Replacing it drops stale responses.
    pipe: Option<Receiver<OutcomeResult>>,
    /// Vector of active asynchronous tasks.
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl BucketViewApp {
    /// Creates a new `BucketViewApp` with the connect dialog open.
    pub fn new(cc: &eframe::CreationContext<'_>, args: &Arguments) -> BucketViewResult<Self> {
        cc.egui_ctx.set_style_init(Visuals::dark());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        // The clipboard is consulted once, here.
        let (token, hint) = if args.token_in_clipboard {
            ClipboardToken::read().into_field()
        } else {
            (args.token.clone().unwrap_or_default(), None)
        };

        let connect = ConnectForm {
            token,
            bucket: args.bucket.clone().unwrap_or_default(),
            hint,
            error: None,
        };

        Ok(Self {
            root: args.root.clone(),
            limit: args.row_limit(),
            connect: Some(connect),
            session: None,
            tree: None,
            selected: None,
            preview: None,
            drop_zone: DropZone::Instructions,
            notification: None,
            runtime,
            pipe: None,
            tasks: Vec::new(),
        })
    }

    /// Checks if a Notification is active and displays it.
    fn check_notification(&mut self, ctx: &Context) {
        if let Some(notification) = &mut self.notification
            && !notification.show(ctx)
        {
            self.notification = None;
        }
    }

    fn notify(&mut self, message: String) {
        self.notification = Some(Box::new(Error { message }));
    }

    /// Polls the pending request, if any.
    ///
    /// Returns `true` while the request is still running.
    fn check_data_pending(&mut self) -> bool {
        let Some(mut output) = self.pipe.take() else {
            return false;
        };

        match output.try_recv() {
            Ok(Ok(outcome)) => {
                self.apply_outcome(outcome);
                false
            }
            Ok(Err(err)) => {
                error!("Request failed: {err}");
                self.show_failure(err.to_string());
                false
            }
            Err(TryRecvError::Empty) => {
                self.pipe = Some(output);
                true
            }
            Err(TryRecvError::Closed) => {
                let message = "Request terminated without response.".to_string();
                error!("{message}");
                self.show_failure(message);
                false
            }
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Connected { session, tree } => {
                self.connect = None;
                self.session = Some(session);
                self.tree = Some(tree);
                self.selected = None;
                self.drop_zone = DropZone::Instructions;
            }
            Outcome::Preview(preview) => {
                self.preview = Some(preview);
                self.drop_zone = DropZone::Instructions;
            }
        }
    }

    /// Failures while the connect dialog is open stay in the dialog; others go to the drop zone.
    fn show_failure(&mut self, message: String) {
        match &mut self.connect {
            Some(form) => form.error = Some(message),
            None => self.drop_zone = DropZone::Failed(message),
        }
    }

    /// Spawns `future` and makes it the one request the UI waits for.
    ///
    /// ### Logic
    /// 1. Forget the handles of tasks that already finished.
    /// 2. Open a fresh oneshot channel and keep its receiver as the pipe,
    ///    replacing the receiver of any earlier request.
    /// 3. Run `future` on the app's runtime and send its result down the channel.
    ///    If the receiver was replaced meanwhile, the send fails and the result is dropped.
    /// 4. Ask egui for a repaint so `check_data_pending` sees the result.
    ///
    /// A request still running is not cancelled, but its response is discarded.
    fn run_data_future(&mut self, future: OutcomeFuture, ctx: &Context) {
        // 1. Housekeeping.
        self.tasks.retain(|task| !task.is_finished());

        // 2. Latest request wins.
        let (tx, rx) = oneshot::channel::<OutcomeResult>();
        self.pipe = Some(rx);

        let ctx_clone = ctx.clone();

        // 3. and 4.
        let handle = self.runtime.spawn(async move {
            let data = future.await;
            if tx.send(data).is_err() {
                tracing::debug!("Stale response discarded.");
            }
            ctx_clone.request_repaint();
        });

        self.tasks.push(handle);
    }

    /// Builds the engine and session from the dialog fields, then issues discovery.
    fn submit_connect(&mut self, ctx: &Context) {
        let Some(form) = &mut self.connect else {
            return;
        };
        form.error = None;

        let session = PolarsEngine::connect(&form.token, &self.root)
            .and_then(|engine| Session::new(Arc::new(engine), &form.bucket))
            .map(|session| session.with_limit(self.limit));

        match session {
            Ok(session) => {
                let future = async move {
                    let tree = session.list_tree().await?;
                    Ok(Outcome::Connected { session, tree })
                };
                self.run_data_future(Box::new(Box::pin(future)), ctx);
            }
            Err(err) => {
                error!("Connection failed: {err}");
                form.error = Some(err.to_string());
            }
        }
    }

    /// Re-runs discovery on the current session.
    fn refresh_tree(&mut self, ctx: &Context) {
        let Some(session) = self.session.clone() else {
            return;
        };
        self.drop_zone = DropZone::Processing(format!("Listing s3://{}/", session.bucket()));
        let future = async move {
            let tree = session.list_tree().await?;
            Ok(Outcome::Connected { session, tree })
        };
        self.run_data_future(Box::new(Box::pin(future)), ctx);
    }

    /// Drops the session and reopens the connect dialog.
    fn disconnect(&mut self) {
        let bucket = self
            .session
            .take()
            .map(|session| session.bucket().to_string())
            .unwrap_or_default();

        self.pipe = None;
        self.tree = None;
        self.selected = None;
        self.preview = None;
        self.drop_zone = DropZone::Instructions;
        self.connect = Some(ConnectForm {
            bucket,
            ..ConnectForm::default()
        });
    }

    /// Previews an object of the bucket in the drawer.
    fn request_preview(&mut self, path: ObjectPath, ctx: &Context) {
        let Some(session) = self.session.clone() else {
            return;
        };
        self.preview = None;
        self.drop_zone = DropZone::Processing(format!("Querying {path}"));
        let future = async move { Ok(Outcome::Preview(session.preview(&path).await?)) };
        self.run_data_future(Box::new(Box::pin(future)), ctx);
    }

    /// Previews a local file given by name and content.
    ///
    /// A path is read inside the spawned request, never on the UI thread.
    fn request_dropped(&mut self, name: String, content: DroppedContent, ctx: &Context) {
        let Some(session) = self.session.clone() else {
            self.drop_zone = DropZone::Failed("Connect to a bucket before dropping files.".into());
            return;
        };
        self.preview = None;
        self.drop_zone = DropZone::Processing(format!("Reading {name}"));
        let future = async move {
            let bytes = content.into_bytes().await?;
            Ok(Outcome::Preview(session.preview_dropped(&name, bytes).await?))
        };
        self.run_data_future(Box::new(Box::pin(future)), ctx);
    }

    /// Handles a file dropped from the desktop: content first, otherwise its path.
    fn handle_dropped_file(&mut self, dropped: egui::DroppedFile, ctx: &Context) {
        let name = match (&dropped.path, dropped.name.is_empty()) {
            (Some(path), true) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => dropped.name.clone(),
        };

        let content = match (dropped.bytes, dropped.path) {
            (Some(bytes), _) => DroppedContent::Bytes(bytes.to_vec()),
            (None, Some(path)) => DroppedContent::Path(path),
            (None, None) => return,
        };
        self.request_dropped(name, content, ctx);
    }

    fn open_local_file(&mut self, ctx: &Context) {
        match self.runtime.block_on(file_dialog::open_file()) {
            Ok(Some(file)) => {
                self.request_dropped(file.name, DroppedContent::Bytes(file.bytes), ctx)
            }
            Ok(None) => {}
            Err(err) => {
                error!("Failed to open file: {err}");
                self.notify(err.to_string());
            }
        }
    }

    fn save_markup(&mut self, contents: String, default_name: &str) {
        if let Err(err) = self
            .runtime
            .block_on(file_dialog::save_html(contents, default_name))
        {
            error!("Failed to save file: {err}");
            self.notify(err.to_string());
        }
    }

    fn render_connect_dialog(&mut self, ctx: &Context) {
        let pending = self.pipe.is_some();
        let Some(form) = &mut self.connect else {
            return;
        };

        let mut submit = false;

        Window::new("Connect")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                if pending {
                    ui.disable();
                }

                egui::Grid::new("connect_grid")
                    .num_columns(2)
                    .spacing([10.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Token");
                        let response = ui.add(
                            TextEdit::singleline(&mut form.token)
                                .password(true)
                                .hint_text("connection token"),
                        );
                        submit |= response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        ui.end_row();

                        ui.label("Bucket");
                        let response =
                            ui.add(TextEdit::singleline(&mut form.bucket).hint_text("bucket name"));
                        submit |= response.lost_focus()
                            && ui.input(|i| i.key_pressed(egui::Key::Enter));
                        ui.end_row();
                    });

                if let Some(hint) = form.hint {
                    ui.label(RichText::new(hint).italics());
                }

                if let Some(message) = &form.error {
                    ui.colored_label(Color32::LIGHT_RED, message);
                }

                ui.horizontal(|ui| {
                    submit |= ui.button("Connect").clicked();
                    if pending {
                        ui.spinner();
                    }
                });
            });

        if submit && !pending {
            self.submit_connect(ctx);
        }
    }

    fn render_drawer(&mut self, ctx: &Context) {
        let Some(preview) = &self.preview else {
            return;
        };

        let mut close = false;
        let width = ctx.available_rect().width() * DRAWER_WIDTH_RATIO;

        SidePanel::right("drawer")
            .resizable(true)
            .default_width(width)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    close = ui.button("✖ Close").clicked();
                });
                ui.separator();
                ScrollArea::horizontal()
                    .auto_shrink([false, false])
                    .show(ui, |ui| preview.render(ui));
            });

        if close {
            self.preview = None;
        }
    }
}

impl eframe::App for BucketViewApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.check_notification(ctx);
        let pending = self.check_data_pending();

        // Handle dropped files.
        if let Some(dropped_file) = ctx.input(|i| i.raw.dropped_files.last().cloned()) {
            self.handle_dropped_file(dropped_file, ctx);
        }

        //  | menu_bar                      theme |
        //  ---------------------------------------
        //  |        |         |                  |
        //  | bucket |  drop   |     drawer       |
        //  | tree   |  zone   |     (preview)    |
        //  |        |         |                  |
        //  ---------------------------------------
        //  | status footer                       |

        TopBottomPanel::top("top_panel").show(ctx, |ui| {
            MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    let connected = self.session.is_some();

                    if ui
                        .add_enabled(connected, egui::Button::new("Open CSV…"))
                        .clicked()
                    {
                        self.open_local_file(ctx);
                        ui.close();
                    }

                    if ui
                        .add_enabled(connected, egui::Button::new("Refresh tree"))
                        .clicked()
                    {
                        self.refresh_tree(ctx);
                        ui.close();
                    }

                    ui.separator();

                    if ui
                        .add_enabled(self.tree.is_some(), egui::Button::new("Save tree as HTML"))
                        .clicked()
                    {
                        if let Some(markup) = self.tree.as_ref().map(TreeView::to_markup) {
                            self.save_markup(markup, "tree.html");
                        }
                        ui.close();
                    }

                    if ui
                        .add_enabled(
                            self.preview.is_some(),
                            egui::Button::new("Save preview as HTML"),
                        )
                        .clicked()
                    {
                        if let Some(html) = self.preview.as_ref().map(|p| p.table.to_html()) {
                            self.save_markup(html, "preview.html");
                        }
                        ui.close();
                    }

                    ui.separator();

                    if ui
                        .add_enabled(connected, egui::Button::new("Disconnect"))
                        .clicked()
                    {
                        self.disconnect();
                        ui.close();
                    }

                    if ui.button("Quit").clicked() {
                        ui.ctx().send_viewport_cmd(ViewportCommand::Close);
                    }
                });

                // Add spacing to align theme switch to the right.
                let delta = ui.available_width() - 15.0;
                if delta > 0.0 {
                    ui.add_space(delta);
                    widgets::global_theme_preference_switch(ui);
                }
            });
        });

        let mut clicked = None;
        SidePanel::left("tree_panel")
            .resizable(true)
            .show(ctx, |ui| {
                ScrollArea::vertical().show(ui, |ui| match &self.tree {
                    Some(tree) if tree.is_empty() => {
                        ui.label(format!("s3://{}/ is empty.", tree.bucket()));
                    }
                    Some(tree) => clicked = tree.render(ui, self.selected),
                    None => {
                        ui.label("Not connected.");
                    }
                });
            });

        if let Some(id) = clicked {
            self.selected = Some(id);
            let path = self.tree.as_ref().and_then(|tree| activated_file(tree, id));
            match path {
                Some(path) => self.request_preview(path, ctx),
                None => tracing::debug!("Ignoring activation of {id:?}"),
            }
        }

        self.render_drawer(ctx);

        TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| match &self.session {
                Some(session) => {
                    ui.label(format!(
                        "s3://{}/ on {}",
                        session.bucket(),
                        self.root.display()
                    ));
                }
                None => {
                    ui.label("no bucket set");
                }
            });
        });

        // CentralPanel must be added after all other panels in your egui layout!
        CentralPanel::default().show(ctx, |ui| {
            warn_if_debug_build(ui);

            ui.centered_and_justified(|ui| match &self.drop_zone {
                DropZone::Processing(what) if pending => {
                    ui.vertical_centered(|ui| {
                        ui.spinner();
                        ui.label(format!("{what}…"));
                    });
                }
                DropZone::Failed(message) => {
                    ui.colored_label(Color32::LIGHT_RED, message);
                }
                _ => {
                    ui.label("Click a file in the tree, or drag and drop a CSV file here.");
                }
            });
        });

        self.render_connect_dialog(ctx);
    }
}

use iced::widget::{
    button, checkbox, column, container, image, row, scrollable, slider, text, text_input,
    Column, Row,
};
use iced::{Alignment, Element, Length, Task, Theme};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod export;
mod net;
mod state;

use config::AppConfig;
use error::{AppError, AppResult};
use export::ExportService;
use net::{CatalogClient, NetError};
use state::data::{ImageDetail, ImageSummary};
use state::edit::{parse_dimension, EditParams, MAX_BLUR};
use state::edit_url::edit_resource_url;
use state::fetch::{CatalogFetcher, FetchState, ImageDetailFetcher, KeyedFetcher, RequestToken};
use state::page::{PageSignal, PageStateController};
use state::session::EditSessionStore;
use state::store::{KeyValueStore, MemoryStore, SqliteStore};

/// Size requested for catalog thumbnails
const THUMBNAIL: EditParams = EditParams {
    width: 300,
    height: 200,
    blur: 0,
    greyscale: false,
};

/// Catalog cards per row
const CARDS_PER_ROW: usize = 3;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "picsum-editor", about = "Browse and edit Picsum photos")]
struct Cli {
    /// Catalog page to open (1-based); defaults to the last page visited
    #[arg(long)]
    page: Option<u32>,
}

/// Which view is showing
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    List,
    /// Editing one image; `from_page` is where "Back" returns to
    Edit { image_id: String, from_page: u32 },
}

/// Edit form contents; width and height stay as typed until saved
#[derive(Debug, Clone)]
struct EditorForm {
    width: String,
    height: String,
    blur: u8,
    greyscale: bool,
    derived_url: Option<String>,
    saving: bool,
}

impl EditorForm {
    fn from_params(params: &EditParams, derived_url: Option<String>) -> Self {
        Self {
            width: params.width.to_string(),
            height: params.height.to_string(),
            blur: params.blur,
            greyscale: params.greyscale,
            derived_url,
            saving: false,
        }
    }

    fn params(&self) -> AppResult<EditParams> {
        let params = EditParams {
            width: parse_dimension("width", &self.width)?,
            height: parse_dimension("height", &self.height)?,
            blur: self.blur,
            greyscale: self.greyscale,
        };
        params.validate()?;
        Ok(params)
    }
}

impl Default for EditorForm {
    fn default() -> Self {
        Self::from_params(&EditParams::default(), None)
    }
}

/// Main application state
struct PicsumEditor {
    config: AppConfig,
    client: CatalogClient,
    exporter: ExportService,
    store: Rc<dyn KeyValueStore>,
    sessions: EditSessionStore,
    pages: PageStateController,
    catalog: CatalogFetcher,
    detail: ImageDetailFetcher,
    /// Downloaded pictures, keyed by URL
    pictures: KeyedFetcher<image::Handle>,
    /// Delayed saves in flight, keyed by image id
    saves: KeyedFetcher<String>,
    /// Images with a saved edit session
    edited: BTreeSet<String>,
    route: Route,
    editor: EditorForm,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User picked a page button
    GoToPage(u32),
    CatalogLoaded(RequestToken, Result<Vec<ImageSummary>, NetError>),
    /// User clicked "Click to Edit" on an image
    OpenEditor(String),
    DetailLoaded(RequestToken, Result<ImageDetail, NetError>),
    PictureLoaded(String, RequestToken, Result<Vec<u8>, NetError>),
    WidthChanged(String),
    HeightChanged(String),
    BlurChanged(u8),
    GreyscaleToggled(bool),
    Save,
    /// Save delay elapsed; reveal and persist the derived URL
    SaveRevealed {
        image_id: String,
        token: RequestToken,
        params: EditParams,
        url: String,
    },
    Download,
    DownloadFinished(Result<PathBuf, String>),
    Back,
}

impl PicsumEditor {
    /// Create a new instance of the application
    fn new(cli: Cli) -> AppResult<Self> {
        let config = config::load_app_config();

        let store: Rc<dyn KeyValueStore> = match SqliteStore::open_default() {
            Ok(store) => Rc::new(store),
            Err(err) => {
                tracing::error!(%err, "failed to open store; edits will not survive a restart");
                Rc::new(MemoryStore::new())
            }
        };

        let client = CatalogClient::new(&config.api_base_url, config.page_size, &config.user_agent)?;
        let exporter = ExportService::new(client.clone());
        let sessions = EditSessionStore::new(store.clone());

        let requested = cli
            .page
            .or_else(|| PageStateController::last_active_page(store.as_ref(), config.total_pages));
        let pages = PageStateController::new(requested, config.total_pages, store.clone());

        let edited: BTreeSet<String> = match sessions.image_ids() {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                tracing::warn!(%err, "failed to list saved edit sessions");
                BTreeSet::new()
            }
        };
        tracing::info!(
            page = pages.active_page(),
            saved_sessions = edited.len(),
            base_url = %config.api_base_url,
            "editor initialized"
        );

        Ok(Self {
            catalog: CatalogFetcher::new(config.page_size),
            detail: ImageDetailFetcher::new(),
            pictures: KeyedFetcher::new(),
            saves: KeyedFetcher::new(),
            edited,
            route: Route::List,
            editor: EditorForm::default(),
            status: String::from("Ready."),
            config,
            client,
            exporter,
            store,
            sessions,
            pages,
        })
    }

    /// Kick off a fetch of the active page
    fn fetch_catalog(&mut self) -> Task<Message> {
        let page = self.pages.active_page();
        let token = self.catalog.begin(page);
        let client = self.client.clone();

        Task::perform(
            async move { client.list_images(page).await },
            move |result| Message::CatalogLoaded(token, result),
        )
    }

    fn fetch_detail(&mut self, image_id: String) -> Task<Message> {
        let token = self.detail.begin(&image_id);
        let client = self.client.clone();

        Task::perform(
            async move { client.image_detail(&image_id).await },
            move |result| Message::DetailLoaded(token, result),
        )
    }

    /// Download a picture for display unless it is already loading or loaded
    fn fetch_picture(&mut self, url: &str) -> Task<Message> {
        if url.is_empty() || self.pictures.is_pending_or_done(url) {
            return Task::none();
        }
        let token = self.pictures.begin(url);
        let client = self.client.clone();
        let url = url.to_string();

        Task::perform(
            {
                let url = url.clone();
                async move { client.fetch_bytes(&url).await }
            },
            move |result| Message::PictureLoaded(url.clone(), token, result),
        )
    }

    fn thumbnail_url(&self, image_id: &str) -> String {
        edit_resource_url(self.client.base_url(), image_id, &THUMBNAIL)
    }

    /// Move the list to `page`, refetching only when it actually changed
    fn show_page(&mut self, page: u32) -> Task<Message> {
        match self.pages.go_to_page(page) {
            Ok(PageSignal::Changed { .. }) => self.fetch_catalog(),
            Ok(PageSignal::Unchanged) => Task::none(),
            Err(err) => {
                self.report(err);
                Task::none()
            }
        }
    }

    fn report(&mut self, err: impl Into<AppError>) {
        let err = err.into();
        tracing::warn!(%err, "operation failed");
        self.status = err.to_string();
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::GoToPage(page) => self.show_page(page),
            Message::CatalogLoaded(token, result) => {
                if !self.catalog.resolve(token, result) {
                    return Task::none();
                }
                if let Some(error) = self.catalog.state().error() {
                    let page = self.catalog.requested_page().unwrap_or(1);
                    self.status = format!("Failed to load page {page}: {error}");
                    return Task::none();
                }

                let thumbnails: Vec<String> = self
                    .catalog
                    .state()
                    .data()
                    .map(|images| {
                        images
                            .iter()
                            .map(|summary| self.thumbnail_url(&summary.id))
                            .collect()
                    })
                    .unwrap_or_default();

                // Keep this page's thumbnails and whatever the editor shows
                let source = self.detail.state().data().map(|detail| detail.download_url.clone());
                let edited = self.editor.derived_url.clone();
                self.pictures.retain(|url| {
                    thumbnails.iter().any(|keep| keep == url)
                        || source.as_deref() == Some(url)
                        || edited.as_deref() == Some(url)
                });

                let tasks: Vec<Task<Message>> = thumbnails
                    .iter()
                    .map(|url| self.fetch_picture(url))
                    .collect();
                Task::batch(tasks)
            }
            Message::OpenEditor(image_id) => {
                self.route = Route::Edit {
                    image_id: image_id.clone(),
                    from_page: self.pages.active_page(),
                };
                self.editor = EditorForm::default();
                self.fetch_detail(image_id)
            }
            Message::DetailLoaded(token, result) => {
                if !self.detail.resolve(token, result, &self.sessions) {
                    return Task::none();
                }
                if let Some(session) = self.detail.restored() {
                    tracing::info!(image_id = %session.image_id, "restored saved edits");
                    self.editor =
                        EditorForm::from_params(&session.params, session.derived_url.clone());
                }

                let source = self.detail.state().data().map(|detail| detail.download_url.clone());
                let edited = self.editor.derived_url.clone();
                let tasks: Vec<Task<Message>> = source
                    .iter()
                    .chain(edited.iter())
                    .map(|url| self.fetch_picture(url))
                    .collect();
                Task::batch(tasks)
            }
            Message::PictureLoaded(url, token, result) => {
                self.pictures
                    .resolve(&url, token, result.map(image::Handle::from_bytes));
                Task::none()
            }
            Message::WidthChanged(value) => {
                self.editor.width = value;
                Task::none()
            }
            Message::HeightChanged(value) => {
                self.editor.height = value;
                Task::none()
            }
            Message::BlurChanged(blur) => {
                self.editor.blur = blur;
                Task::none()
            }
            Message::GreyscaleToggled(greyscale) => {
                self.editor.greyscale = greyscale;
                Task::none()
            }
            Message::Save => {
                let Route::Edit { image_id, .. } = &self.route else {
                    return Task::none();
                };
                let image_id = image_id.clone();
                let params = match self.editor.params() {
                    Ok(params) => params,
                    Err(err) => {
                        self.report(err);
                        return Task::none();
                    }
                };

                let url = edit_resource_url(self.client.base_url(), &image_id, &params);
                let delay = Duration::from_millis(self.config.save_delay_ms);
                let token = self.saves.begin(&image_id);
                self.editor.saving = true;

                Task::perform(
                    async move {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    },
                    move |()| Message::SaveRevealed {
                        image_id: image_id.clone(),
                        token,
                        params,
                        url: url.clone(),
                    },
                )
            }
            Message::SaveRevealed {
                image_id,
                token,
                params,
                url,
            } => {
                // A newer save of the same image supersedes this one
                if !self
                    .saves
                    .resolve::<std::convert::Infallible>(&image_id, token, Ok(url.clone()))
                {
                    return Task::none();
                }

                let saved = self.sessions.save(&image_id, &params, Some(&url));
                if saved.is_ok() {
                    self.edited.insert(image_id.clone());
                }
                let still_open = matches!(
                    &self.route,
                    Route::Edit { image_id: current, .. } if *current == image_id
                );
                if still_open {
                    self.editor.saving = false;
                }

                match saved {
                    Err(err) => self.report(err),
                    Ok(()) if still_open => {
                        self.editor.derived_url = Some(url.clone());
                        self.status = if params.is_unedited() {
                            String::from("Saved with default settings.")
                        } else {
                            String::from("Changes saved.")
                        };
                        return self.fetch_picture(&url);
                    }
                    Ok(()) => {}
                }
                Task::none()
            }
            Message::Download => {
                let (Route::Edit { image_id, .. }, Some(url)) =
                    (&self.route, self.editor.derived_url.clone())
                else {
                    return Task::none();
                };

                let name = export::export_file_name(image_id);
                let exporter = self.exporter.clone();
                self.status = format!("Downloading {name}...");

                Task::perform(
                    async move {
                        exporter
                            .export(&url, &name)
                            .await
                            .map_err(|err| AppError::from(err).to_string())
                    },
                    Message::DownloadFinished,
                )
            }
            Message::DownloadFinished(result) => {
                self.status = match result {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(err) => {
                        tracing::error!(%err, "download error");
                        format!("Download failed: {err}")
                    }
                };
                Task::none()
            }
            Message::Back => {
                let page = match &self.route {
                    Route::Edit { from_page, .. } => *from_page,
                    Route::List => PageStateController::last_active_page(
                        self.store.as_ref(),
                        self.pages.total_pages(),
                    )
                    .unwrap_or(1),
                };
                self.route = Route::List;

                match self.pages.reconcile(page) {
                    Ok(PageSignal::Changed { .. }) => self.fetch_catalog(),
                    Ok(PageSignal::Unchanged) => Task::none(),
                    Err(err) => {
                        self.report(err);
                        Task::none()
                    }
                }
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let body = match &self.route {
            Route::List => self.list_view(),
            Route::Edit { .. } => self.edit_view(),
        };

        let content: Column<Message> = column![
            text("Image Editor").size(40),
            body,
            text(&self.status).size(14),
        ]
        .spacing(20)
        .padding(30)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    /// A downloaded picture, or a placeholder while it loads
    fn picture_view(&self, url: &str, width: f32) -> Element<Message> {
        match self.pictures.state(url) {
            Some(FetchState::Success(handle)) => {
                let picture: image::Image<image::Handle> = image(handle.clone());
                picture.width(Length::Fixed(width)).into()
            }
            Some(FetchState::Failure(_)) => text("Image unavailable").size(12).into(),
            _ => text("Loading image...").size(12).into(),
        }
    }

    fn card_view<'a>(&'a self, summary: &'a ImageSummary) -> Element<'a, Message> {
        let label = if self.edited.contains(&summary.id) {
            format!("{} (edited)", summary.author)
        } else {
            summary.author.clone()
        };

        column![
            self.picture_view(&self.thumbnail_url(&summary.id), THUMBNAIL.width as f32),
            text(label).size(12),
            button(text("Click to Edit").size(13))
                .on_press(Message::OpenEditor(summary.id.clone())),
        ]
        .spacing(6)
        .width(Length::Fixed(THUMBNAIL.width as f32))
        .into()
    }

    fn list_view(&self) -> Element<Message> {
        let images: Element<Message> = match self.catalog.state() {
            FetchState::Idle | FetchState::Loading => text("Loading...").into(),
            FetchState::Failure(error) => text(format!("Error: {error}")).into(),
            FetchState::Success(images) => {
                Column::with_children(images.chunks(CARDS_PER_ROW).map(|cards| {
                    Element::from(
                        Row::with_children(cards.iter().map(|summary| self.card_view(summary)))
                            .spacing(12),
                    )
                }))
                .spacing(12)
                .into()
            }
        };

        let active = self.pages.active_page();
        let pagination = Row::with_children((1..=self.pages.total_pages()).map(|page| {
            Element::from(
                button(text(page.to_string()).size(12))
                    .on_press(Message::GoToPage(page))
                    .style(if page == active {
                        button::primary
                    } else {
                        button::secondary
                    }),
            )
        }))
        .spacing(6);

        column![scrollable(images).height(Length::Fill), pagination]
            .spacing(20)
            .align_x(Alignment::Center)
            .into()
    }

    fn edit_view(&self) -> Element<Message> {
        let back = button(text("Back").size(12)).on_press(Message::Back);

        let detail = match self.detail.state() {
            FetchState::Idle | FetchState::Loading => {
                return column![text("Loading..."), back].spacing(10).into();
            }
            FetchState::Failure(error) => {
                return column![text(format!("Error: {error}")), back]
                    .spacing(10)
                    .into();
            }
            FetchState::Success(detail) => detail,
        };

        let form = &self.editor;
        let dimensions = row![
            text("Width:").size(13),
            text_input("50", &form.width)
                .on_input(Message::WidthChanged)
                .width(Length::Fixed(80.0)),
            text("Height:").size(13),
            text_input("50", &form.height)
                .on_input(Message::HeightChanged)
                .width(Length::Fixed(80.0)),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let blur = row![
            text(format!("Blur (0-{MAX_BLUR}):")).size(12),
            slider(0..=MAX_BLUR, form.blur, Message::BlurChanged).width(Length::Fixed(200.0)),
            text(form.blur.to_string()).size(12),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let save = button(text(if form.saving { "Saving..." } else { "Save Changes" }).size(12))
            .on_press_maybe((!form.saving).then_some(Message::Save));

        let edited: Element<Message> = if form.saving {
            text("Applying changes...").into()
        } else if let Some(url) = &form.derived_url {
            self.picture_view(url, 400.0)
        } else {
            text("No edits applied yet.").size(12).into()
        };

        let download = button(text("Download Edited Image").size(12))
            .on_press_maybe(form.derived_url.as_ref().map(|_| Message::Download));

        let content = column![
            text(format!("#{} by {}", detail.id, detail.author)).size(20),
            self.picture_view(&detail.download_url, 520.0),
            text(format!("{} x {} original", detail.width, detail.height)).size(12),
            text("Edit Options").size(14),
            dimensions,
            checkbox("Apply Greyscale", form.greyscale).on_toggle(Message::GreyscaleToggled),
            blur,
            save,
            text("Edited Image").size(14),
            edited,
            download,
            back,
        ]
        .spacing(12)
        .width(Length::Fixed(560.0));

        scrollable(content).height(Length::Fill).into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("picsum_editor=info")),
        )
        .init();

    let cli = Cli::parse();

    // Startup only fails when the HTTP client cannot be built
    let editor = match PicsumEditor::new(cli) {
        Ok(editor) => editor,
        Err(err) => {
            tracing::error!(%err, "failed to start");
            std::process::exit(1);
        }
    };

    iced::application("Picsum Editor", PicsumEditor::update, PicsumEditor::view)
        .theme(PicsumEditor::theme)
        .centered()
        .run_with(move || {
            let mut editor = editor;
            let task = editor.fetch_catalog();
            (editor, task)
        })
}

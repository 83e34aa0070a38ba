use face_console::camera::{CameraController, CapturedImage, DataUri, V4lBackend};
use face_console::cli::{render, shell, AsciiRenderer, ShellOptions, TerminalUi};
use face_console::common::config::CameraConfig;
use face_console::common::{Config, DevMode};
use face_console::core::recognition::DisplayedImage;
use face_console::core::{
    FormField, RecognitionPanel, RecognitionSettings, Registration, SortKey, UserManagementPanel,
};
use face_console::service::HttpFaceApi;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "faceconsole")]
#[command(about = "Webcam face recognition and user administration client")]
struct Cli {
    /// Enable development mode (verbose logs, captures saved to ./dev_data)
    #[arg(long, global = true)]
    dev: bool,

    /// Config file to use instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the service base URL
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List capture devices
    Devices,
    /// Capture (or load) one image and recognize the faces in it
    Recognize {
        #[command(flatten)]
        source: ImageSource,
        /// Confidence threshold 0-100
        #[arg(short, long)]
        confidence: Option<i64>,
        #[command(flatten)]
        details: DetailFlags,
        /// Write the annotated image to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Interactive recognition shell
    Live {
        #[arg(short, long)]
        device: Option<u32>,
    },
    /// Manage registered users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Print the roster
    List {
        #[arg(short, long)]
        filter: Option<String>,
        /// name, id or created_at
        #[arg(short, long, conflicts_with = "filter")]
        sort: Option<SortKey>,
    },
    /// Print one user with their face images
    Show { id: String },
    /// Change profile fields; unspecified fields keep their value
    Update {
        id: String,
        #[command(flatten)]
        fields: ProfileFields,
    },
    /// Delete a user and all their face images
    Delete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Enroll one more face image for a user
    AddFace {
        id: String,
        #[command(flatten)]
        source: ImageSource,
    },
    /// Delete face image INDEX (1-based) of a user
    DeleteFace {
        id: String,
        index: usize,
        #[arg(short, long)]
        yes: bool,
    },
    /// Register a new user from one face image
    Register {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: ContactFields,
        #[command(flatten)]
        source: ImageSource,
    },
    /// Interactive admin shell
    Shell,
}

#[derive(Args)]
struct ImageSource {
    /// Capture device index
    #[arg(short, long, conflicts_with = "image")]
    device: Option<u32>,
    /// Use an image file instead of the camera
    #[arg(short, long)]
    image: Option<PathBuf>,
}

#[derive(Args)]
struct DetailFlags {
    /// Ask for matched users' details even if the config turns them off
    #[arg(long, overrides_with = "no_details")]
    details: bool,
    /// Do not ask for user details
    #[arg(long, overrides_with = "details")]
    no_details: bool,
}

impl DetailFlags {
    /// The last flag given wins; without either the config value applies.
    fn resolve(&self, configured: bool) -> bool {
        match (self.details, self.no_details) {
            (true, _) => true,
            (_, true) => false,
            _ => configured,
        }
    }
}

#[derive(Args)]
struct ContactFields {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    department: Option<String>,
}

impl ContactFields {
    fn assignments(&self) -> Vec<(FormField, String)> {
        [
            (FormField::Email, &self.email),
            (FormField::Phone, &self.phone),
            (FormField::Position, &self.position),
            (FormField::Department, &self.department),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.clone().map(|v| (field, v)))
        .collect()
    }
}

#[derive(Args)]
struct ProfileFields {
    #[arg(long)]
    name: Option<String>,
    #[command(flatten)]
    contact: ContactFields,
}

impl ProfileFields {
    fn assignments(&self) -> Vec<(FormField, String)> {
        let mut assignments: Vec<_> = self.name.clone().map(|n| (FormField::Name, n)).into_iter().collect();
        assignments.extend(self.contact.assignments());
        assignments
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let dev_mode = DevMode::new(cli.dev)?;
    let config = Config::load(cli.config.as_deref())?.with_server_override(cli.server)?;
    tracing::debug!("Using service at {}", config.server.base_url);

    let ok = match cli.command {
        Commands::Devices => {
            let camera = camera_controller(&config.camera, None);
            println!("{}", render::devices(&camera.list_devices()));
            true
        }
        Commands::Recognize { source, confidence, details, save } => {
            let show_details = details.resolve(config.recognition.show_details);
            recognize(&config, &dev_mode, source, confidence, show_details, save)?
        }
        Commands::Live { device } => {
            let api = HttpFaceApi::new(&config.server)?;
            let settings = RecognitionSettings::new(
                config.recognition.confidence as i64,
                config.recognition.show_details,
            );
            let mut panel = RecognitionPanel::new(
                api,
                camera_controller(&config.camera, device),
                settings,
                TerminalUi::stdio(false),
            );
            shell::run_live(&mut panel, &shell_options(&config, dev_mode))?;
            true
        }
        Commands::Users { command } => users(&config, dev_mode, command)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}

fn camera_controller(camera: &CameraConfig, device: Option<u32>) -> CameraController<V4lBackend> {
    let mut camera = camera.clone();
    if let Some(index) = device {
        camera.device_index = index;
    }
    CameraController::new(
        V4lBackend::new(&camera),
        camera.width,
        camera.height,
        camera.jpeg_quality,
    )
}

fn shell_options(config: &Config, dev: DevMode) -> ShellOptions {
    ShellOptions {
        dev,
        preview: config
            .preview
            .enabled
            .then(|| AsciiRenderer::new(config.preview.width, config.preview.height)),
        jpeg_quality: config.camera.jpeg_quality,
    }
}

/// Load the file, or grab a single frame from the camera.
fn acquire_image(config: &Config, dev_mode: &DevMode, source: &ImageSource) -> Result<CapturedImage> {
    if let Some(path) = &source.image {
        return CapturedImage::from_file(path, config.camera.jpeg_quality)
            .with_context(|| format!("Không thể đọc ảnh {}", path.display()));
    }

    let mut camera = camera_controller(&config.camera, source.device);
    camera.start(None).context("Không thể truy cập camera")?;
    let frame = camera.capture_frame()?;
    camera.stop();

    let frame = frame.ok_or_else(|| anyhow!("Camera did not produce a frame"))?;
    dev_mode.save("capture", frame.jpeg_bytes())?;
    Ok(frame)
}

fn recognize(
    config: &Config,
    dev_mode: &DevMode,
    source: ImageSource,
    confidence: Option<i64>,
    show_details: bool,
    save: Option<PathBuf>,
) -> Result<bool> {
    let api = HttpFaceApi::new(&config.server)?;
    let settings = RecognitionSettings::new(
        confidence.unwrap_or(config.recognition.confidence as i64),
        show_details,
    );
    let mut panel = RecognitionPanel::new(
        api,
        camera_controller(&config.camera, source.device),
        settings,
        TerminalUi::stdio(false),
    );

    let ok = match &source.image {
        Some(_) => {
            let image = acquire_image(config, dev_mode, &source)?;
            panel.recognize_image(image)
        }
        None => {
            let started = panel.start_camera(None);
            let ok = started && panel.recognize();
            panel.stop_camera();
            ok
        }
    };
    if !ok {
        return Ok(false);
    }

    let options = shell_options(config, dev_mode.clone());
    shell::save_annotated(dev_mode, panel.view());
    println!("{}", shell::describe_recognition(panel.view(), options.preview.as_ref()));

    if let Some(path) = save {
        if let Some(DisplayedImage::Annotated(uri)) = &panel.view().displayed_image {
            let data = DataUri::parse(uri)?;
            std::fs::write(&path, &data.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("💾 Saved annotated image to {}", path.display());
        }
    }

    Ok(true)
}

fn users(config: &Config, dev_mode: DevMode, command: UserCommands) -> Result<bool> {
    let api = HttpFaceApi::new(&config.server)?;
    let assume_yes = matches!(
        command,
        UserCommands::Delete { yes: true, .. } | UserCommands::DeleteFace { yes: true, .. }
    );
    let device = match &command {
        UserCommands::AddFace { source, .. } => source.device,
        _ => None,
    };
    let mut panel = UserManagementPanel::new(
        api,
        camera_controller(&config.camera, device),
        TerminalUi::stdio(assume_yes),
    );

    let ok = match command {
        UserCommands::List { filter, sort } => {
            let loaded = panel.load_users();
            if let Some(query) = filter {
                panel.filter(&query);
            }
            if let Some(key) = sort {
                panel.sort(key);
            }
            println!("{}", render::roster(panel.listing()));
            loaded
        }
        UserCommands::Show { id } => {
            let ok = panel.open_user(&id);
            if let Some(text) = render::detail(panel.session()) {
                println!("{}", text);
            }
            ok
        }
        UserCommands::Update { id, fields } => {
            let assignments = fields.assignments();
            if assignments.is_empty() {
                bail!("Nothing to update: pass at least one of --name, --email, --phone, --position, --department");
            }
            if !panel.open_user(&id) {
                return Ok(false);
            }
            if let Some(form) = panel.form_mut() {
                for (field, value) in assignments {
                    form.set(field, value);
                }
            }
            panel.update_user()
        }
        UserCommands::Delete { id, .. } => panel.open_user(&id) && panel.delete_user(),
        UserCommands::AddFace { id, source } => {
            if !panel.open_user(&id) {
                return Ok(false);
            }
            let staged = match &source.image {
                Some(_) => {
                    panel.stage_face_image(acquire_image(config, &dev_mode, &source)?);
                    true
                }
                None => {
                    let ok = panel.toggle_camera() && panel.capture_face();
                    if let Some(image) = &panel.enrollment().captured {
                        dev_mode.save("enroll", image.jpeg_bytes())?;
                    }
                    ok
                }
            };
            let ok = staged && panel.save_face();
            if let Some(text) = render::detail(panel.session()) {
                println!("{}", text);
            }
            panel.close();
            ok
        }
        UserCommands::DeleteFace { id, index, .. } => {
            let ok = panel.open_user(&id) && panel.delete_face(index);
            if let Some(text) = render::detail(panel.session()) {
                println!("{}", text);
            }
            ok
        }
        UserCommands::Register { id, name, fields, source } => {
            let image = acquire_image(config, &dev_mode, &source)?;
            let attributes: BTreeMap<String, String> = fields
                .assignments()
                .into_iter()
                .map(|(field, value)| (field.key().to_string(), value))
                .collect();
            let registration = Registration { user_id: id, name, attributes };
            panel.register_user(registration, &image)
        }
        UserCommands::Shell => {
            shell::run_admin(&mut panel, &shell_options(config, dev_mode))?;
            true
        }
    };

    Ok(ok)
}

use eframe::egui;
use rfd::FileDialog;
use std::path::PathBuf;
use std::time::Duration;

use snapedit::input::parse_angle;
use snapedit::{EditError, Editor, Frame, Region, Settings, TaskHandle, Webcam};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp", "gif"];

fn main() -> Result<(), eframe::Error> {
    // Log to stderr, override with RUST_LOG=debug.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(settings.window_size)
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SnapEdit",
        options,
        Box::new(move |_cc| {
            let app = SnapEditApp::new(settings)?;
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
}

/// Raw contents of the parameter text fields.
struct InputFields {
    channel: String,
    crop_x: String,
    crop_y: String,
    crop_width: String,
    crop_height: String,
    angle: String,
    rect_x: String,
    rect_y: String,
    rect_width: String,
    rect_height: String,
}

impl Default for InputFields {
    fn default() -> Self {
        Self {
            channel: "red".to_string(),
            crop_x: "0".to_string(),
            crop_y: "0".to_string(),
            crop_width: "100".to_string(),
            crop_height: "100".to_string(),
            angle: "90".to_string(),
            rect_x: "0".to_string(),
            rect_y: "0".to_string(),
            rect_width: "20".to_string(),
            rect_height: "10".to_string(),
        }
    }
}

struct SnapEditApp {
    // Declared before the runtime so the worker queue closes first.
    editor: Editor,
    _runtime: tokio::runtime::Runtime,
    settings: Settings,
    fields: InputFields,
    pending: Vec<TaskHandle>,
    texture: Option<egui::TextureHandle>,
    shown_generation: u64,
    status_message: String,
    error_message: Option<String>,
}

impl SnapEditApp {
    fn new(settings: Settings) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        let editor = Editor::new(runtime.handle());

        Ok(Self {
            editor,
            _runtime: runtime,
            settings,
            fields: InputFields::default(),
            pending: Vec::new(),
            texture: None,
            shown_generation: 0,
            status_message: "Ready".to_string(),
            error_message: None,
        })
    }
}

impl eframe::App for SnapEditApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.collect_finished();
        self.refresh_texture(ctx);

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.show_status_bar(ui);
        });

        egui::SidePanel::left("controls")
            .resizable(false)
            .show(ctx, |ui| {
                self.show_controls(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_image(ui);
        });

        self.show_error_window(ctx);

        // Nothing wakes egui when a background edit finishes, so keep polling.
        if !self.pending.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(30));
        }
    }
}

impl SnapEditApp {
    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Image");
        if ui.button("📁 Choose image...").clicked() {
            self.choose_image();
        }

        ui.horizontal(|ui| {
            if ui.button("📷 Capture from webcam").clicked() {
                let camera = Webcam::new(self.settings.camera_index);
                self.track(self.editor.capture(camera));
            }
            let mut index = self.settings.camera_index;
            let response = ui.add(egui::DragValue::new(&mut index).range(0..=15).prefix("#"));
            if response.changed() {
                self.settings.camera_index = index;
                self.save_settings();
            }
        });

        ui.separator();
        ui.label("Channel (red/green/blue):");
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.fields.channel).desired_width(80.0));
            if ui.button("Show channel").clicked() {
                let name = self.fields.channel.clone();
                self.track(self.editor.extract_channel(name));
            }
        });

        ui.separator();
        ui.label("Crop (x, y, width, height):");
        region_fields(
            ui,
            "crop",
            [
                &mut self.fields.crop_x,
                &mut self.fields.crop_y,
                &mut self.fields.crop_width,
                &mut self.fields.crop_height,
            ],
        );
        if ui.button("Crop").clicked() {
            match Region::from_fields(
                &self.fields.crop_x,
                &self.fields.crop_y,
                &self.fields.crop_width,
                &self.fields.crop_height,
            ) {
                Ok(region) => self.track(self.editor.crop(region)),
                Err(err) => self.report(err),
            }
        }

        ui.separator();
        ui.label("Rotation angle (degrees):");
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.fields.angle).desired_width(80.0));
            if ui.button("Rotate").clicked() {
                match parse_angle(&self.fields.angle) {
                    Ok(angle) => self.track(self.editor.rotate(angle)),
                    Err(err) => self.report(err),
                }
            }
        });

        ui.separator();
        ui.label("Rectangle (x, y, width, height):");
        region_fields(
            ui,
            "rect",
            [
                &mut self.fields.rect_x,
                &mut self.fields.rect_y,
                &mut self.fields.rect_width,
                &mut self.fields.rect_height,
            ],
        );
        if ui.button("Draw rectangle").clicked() {
            match Region::from_fields(
                &self.fields.rect_x,
                &self.fields.rect_y,
                &self.fields.rect_width,
                &self.fields.rect_height,
            ) {
                Ok(region) => self.track(self.editor.draw_rectangle(region)),
                Err(err) => self.report(err),
            }
        }

        ui.separator();
        if ui.button("↺ Reset image").clicked() {
            self.track(self.editor.reset());
        }
    }

    fn show_image(&mut self, ui: &mut egui::Ui) {
        match &self.texture {
            Some(texture) => {
                egui::ScrollArea::both().show(ui, |ui| {
                    ui.image((texture.id(), texture.size_vec2()));
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label("No image loaded. Choose a file or capture one from the webcam.");
                });
            }
        }
    }

    fn show_status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status_message);
            if !self.pending.is_empty() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Cancel").clicked() {
                        for handle in &self.pending {
                            handle.cancel();
                        }
                    }
                    ui.spinner();
                    ui.label(format!("{} running", self.pending.len()));
                });
            }
        });
    }

    fn show_error_window(&mut self, ctx: &egui::Context) {
        let mut dismissed = false;
        if let Some(message) = &self.error_message {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(message);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
        }
        if dismissed {
            self.error_message = None;
        }
    }

    fn choose_image(&mut self) {
        let mut dialog = FileDialog::new().add_filter("Images", IMAGE_EXTENSIONS);
        if let Some(dir) = &self.settings.last_directory {
            dialog = dialog.set_directory(dir);
        }

        if let Some(path) = dialog.pick_file() {
            self.remember_directory(&path);
            self.status_message = format!("Loading {}...", path.display());
            self.track(self.editor.load(path));
        }
    }

    fn remember_directory(&mut self, path: &std::path::Path) {
        let dir: Option<PathBuf> = path.parent().map(|p| p.to_path_buf());
        if dir.is_some() && dir != self.settings.last_directory {
            self.settings.last_directory = dir;
            self.save_settings();
        }
    }

    fn save_settings(&self) {
        if let Err(err) = self.settings.save() {
            log::warn!("Could not save settings: {}", err);
        }
    }

    fn track(&mut self, handle: TaskHandle) {
        log::debug!("Submitted {}", handle.label());
        self.pending.push(handle);
    }

    fn report(&mut self, err: EditError) {
        log::warn!("{}", err);
        self.status_message = format!("Error: {}", err);
        self.error_message = Some(err.to_string());
    }

    fn collect_finished(&mut self) {
        let mut finished = Vec::new();
        self.pending.retain_mut(|handle| match handle.try_result() {
            Some(outcome) => {
                finished.push((handle.label(), outcome));
                false
            }
            None => true,
        });

        for (label, outcome) in finished {
            match outcome {
                Ok(frame) => {
                    self.status_message = format!(
                        "{}: {}x{}",
                        label,
                        frame.image.width(),
                        frame.image.height()
                    );
                }
                Err(EditError::Cancelled) => {
                    self.status_message = format!("{} cancelled", label);
                }
                Err(err) => self.report(err),
            }
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.editor.latest() {
            if frame.generation != self.shown_generation {
                self.upload(ctx, &frame);
            }
        }
    }

    fn upload(&mut self, ctx: &egui::Context, frame: &Frame) {
        let rgba = frame.image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());

        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture(
                    "current_image",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
        self.shown_generation = frame.generation;
    }
}

fn region_fields(ui: &mut egui::Ui, id: &str, fields: [&mut String; 4]) {
    let hints = ["x", "y", "width", "height"];
    ui.push_id(id, |ui| {
        ui.horizontal(|ui| {
            for (field, hint) in fields.into_iter().zip(hints) {
                ui.add(
                    egui::TextEdit::singleline(field)
                        .desired_width(45.0)
                        .hint_text(hint),
                );
            }
        });
    });
}

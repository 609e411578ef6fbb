use eframe::{egui, App, Frame, NativeOptions};
use egui::text::{LayoutJob, TextFormat};
use egui::{Align, Color32, FontId, Layout, RichText, TextStyle};
use javapad_compile::{
    compile_and_run, RunReport, RunRequest, RunStatus, Toolchain, DEFAULT_TIMEOUT,
};
use javapad_core::{ensure_java_extension, SourceDocument};
use javapad_highlight::{builtin, HighlightPalette, LanguageDefinition};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

const APP_TITLE: &str = "JavaPad – Java Code Compiler and Runner";

/// Seed buffer shown on startup, matching the placeholder class name the
/// runner falls back to.
const DEFAULT_SOURCE: &str = "public class TempClass {\n    public static void main(String[] args) {\n        System.out.println(\"Hello, World!\");\n    }\n}\n";

// Toolbar button fills. （工具列按鈕的底色。）
const RUN_FILL: Color32 = Color32::from_rgb(76, 175, 80);
const SAVE_FILL: Color32 = Color32::from_rgb(33, 150, 243);
const LOAD_FILL: Color32 = Color32::from_rgb(255, 193, 7);
const CLEAR_FILL: Color32 = Color32::from_rgb(244, 67, 54);

const SUCCESS_TEXT: Color32 = Color32::from_rgb(76, 175, 80);
const FAILURE_TEXT: Color32 = Color32::from_rgb(239, 68, 68);

struct OutputDisplay {
    text: String,
    color: Color32,
}

#[derive(Debug, Clone)]
struct PreferencesState {
    timeout_secs: u64,
    editor_font_size: f32,
}

impl Default for PreferencesState {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            editor_font_size: 14.0,
        }
    }
}

struct JavaPadApp {
    document: SourceDocument,
    args_text: String,
    output: Option<OutputDisplay>,
    status: String,
    run_receiver: Option<Receiver<Result<RunReport, String>>>,
    language: LanguageDefinition,
    show_preferences: bool,
    preferences: PreferencesState,
}

impl Default for JavaPadApp {
    fn default() -> Self {
        Self {
            document: SourceDocument::with_contents(DEFAULT_SOURCE),
            args_text: String::new(),
            output: None,
            status: "Ready".to_string(),
            run_receiver: None,
            language: builtin::java(),
            show_preferences: false,
            preferences: PreferencesState::default(),
        }
    }
}

impl JavaPadApp {
    fn run_in_flight(&self) -> bool {
        self.run_receiver.is_some()
    }

    /// Hands one compile-and-run cycle to a worker thread. The Run button is
    /// disabled until the report comes back, so a second cycle can never
    /// overlap the first.
    fn start_run(&mut self, ctx: &egui::Context) {
        if self.run_in_flight() {
            return;
        }
        let toolchain = match Toolchain::locate() {
            Ok(toolchain) => toolchain,
            Err(err) => {
                self.show_error(err.to_string());
                return;
            }
        };

        let request = RunRequest::new(self.document.contents())
            .with_args(self.args_text.clone())
            .with_timeout(Duration::from_secs(self.preferences.timeout_secs.max(1)));

        let (sender, receiver) = channel();
        self.run_receiver = Some(receiver);
        self.status = "Running…".to_string();
        self.output = None;

        // The timeout is enforced inside the worker (the child is killed when
        // the budget runs out), so the GUI thread never blocks on the run.
        // （逾時控制在背景執行緒內完成，超出預算即終止子行程，GUI 執行緒
        // 不需等待。）
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = compile_and_run(&toolchain, &request).map_err(|err| err.to_string());
            let _ = sender.send(result);
            ctx.request_repaint();
        });
    }

    fn poll_run_result(&mut self) {
        let Some(receiver) = &self.run_receiver else {
            return;
        };
        match receiver.try_recv() {
            Ok(Ok(report)) => {
                self.run_receiver = None;
                self.show_report(report);
            }
            Ok(Err(message)) => {
                self.run_receiver = None;
                self.show_error(message);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.run_receiver = None;
                self.show_error("run worker exited before reporting".to_string());
            }
        }
    }

    fn show_report(&mut self, report: RunReport) {
        log::info!(
            "run of {} finished in {}ms: {:?}",
            report.class_name,
            report.duration_ms,
            report.status
        );
        let (color, status) = match report.status {
            RunStatus::CompiledAndRan { exit_code: Some(0) } => {
                (SUCCESS_TEXT, "Execution complete".to_string())
            }
            RunStatus::CompiledAndRan { exit_code } => (
                FAILURE_TEXT,
                match exit_code {
                    Some(code) => format!("Program exited with code {code}"),
                    None => "Program was terminated by a signal".to_string(),
                },
            ),
            RunStatus::CompileFailed => (FAILURE_TEXT, "Compilation failed".to_string()),
            RunStatus::TimedOut => (
                FAILURE_TEXT,
                format!(
                    "Execution timed out after {} seconds",
                    self.preferences.timeout_secs
                ),
            ),
        };
        let text = if report.output.is_empty() {
            "(no output)".to_string()
        } else {
            report.output
        };
        self.output = Some(OutputDisplay { text, color });
        self.status = status;
    }

    fn show_error(&mut self, message: String) {
        log::warn!("run failed: {message}");
        self.output = Some(OutputDisplay {
            text: format!("Error: {message}"),
            color: FAILURE_TEXT,
        });
        self.status = "Error".to_string();
    }

    fn save_file(&mut self) {
        if self.document.path().is_some() {
            match self.document.save() {
                Ok(()) => {
                    self.status =
                        format!("File saved: {}", self.document.file_name().unwrap_or("?"));
                }
                Err(err) => self.status = format!("Error saving file: {err}"),
            }
            return;
        }
        self.save_file_as();
    }

    fn save_file_as(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Java Files", &["java"])
            .save_file()
        else {
            return;
        };
        let path = ensure_java_extension(path);
        match self.document.save_as(&path) {
            Ok(()) => {
                self.status = format!("File saved: {}", self.document.file_name().unwrap_or("?"));
            }
            Err(err) => self.status = format!("Error saving file: {err}"),
        }
    }

    fn load_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Java Files", &["java"])
            .pick_file()
        else {
            return;
        };
        match SourceDocument::open(&path) {
            Ok(document) => {
                self.document = document;
                self.status = format!("File loaded: {}", self.document.file_name().unwrap_or("?"));
            }
            Err(err) => self.status = format!("Error loading file: {err}"),
        }
    }

    fn clear_output(&mut self) {
        self.output = None;
        self.status = "Output cleared".to_string();
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let run = toolbar_button(ui, !self.run_in_flight(), "Run", RUN_FILL)
                        .on_hover_text("Compile and Run Code");
                    if run.clicked() {
                        self.start_run(ctx);
                    }

                    if toolbar_button(ui, true, "Save", SAVE_FILL)
                        .on_hover_text("Save Code")
                        .clicked()
                    {
                        self.save_file();
                    }
                    if toolbar_button(ui, true, "Load", LOAD_FILL)
                        .on_hover_text("Load Code")
                        .clicked()
                    {
                        self.load_file();
                    }
                    if toolbar_button(ui, true, "Clear", CLEAR_FILL)
                        .on_hover_text("Clear Output")
                        .clicked()
                    {
                        self.clear_output();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Preferences…").clicked() {
                            self.show_preferences = !self.show_preferences;
                        }
                        if self.run_in_flight() {
                            ui.spinner();
                        }
                    });
                });
            });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    ui.label(RichText::new(&self.status).strong());
                });
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.label(format!("Timeout: {} s", self.preferences.timeout_secs));
                    if self.document.is_dirty() {
                        ui.separator();
                        ui.label("Modified");
                    }
                });
            });
    }

    fn show_output_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("output_panel")
            .resizable(true)
            .min_height(120.0)
            .default_height(200.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Arguments:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.args_text)
                            .hint_text("whitespace-separated, no quoting")
                            .desired_width(f32::INFINITY),
                    );
                });
                ui.separator();
                ui.label(RichText::new("Output").strong());
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| match &self.output {
                        Some(display) => {
                            ui.label(
                                RichText::new(&display.text)
                                    .monospace()
                                    .color(display.color),
                            );
                        }
                        None => {
                            ui.label(RichText::new("(run output appears here)").weak());
                        }
                    });
            });
    }

    fn show_editor(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label(RichText::new("Java Code").strong());
            let palette = if ui.visuals().dark_mode {
                HighlightPalette::classic_dark()
            } else {
                HighlightPalette::classic()
            };
            let default_color = ui.visuals().text_color();
            let font_size = self.preferences.editor_font_size;
            let language = &self.language;

            let mut layouter = |ui: &egui::Ui, text: &str, wrap_width: f32| {
                let mut job =
                    highlight_layout_job(language, &palette, text, font_size, default_color);
                job.wrap.max_width = wrap_width;
                ui.fonts(|fonts| fonts.layout_job(job))
            };

            let mut buffer = self.document.contents().to_string();
            let response = ui.add_sized(
                ui.available_size(),
                egui::TextEdit::multiline(&mut buffer)
                    .font(TextStyle::Monospace)
                    .desired_width(f32::INFINITY)
                    .layouter(&mut layouter),
            );
            if response.changed() {
                self.document.set_contents(buffer);
            }
        });
    }

    fn show_preferences_window(&mut self, ctx: &egui::Context) {
        if !self.show_preferences {
            return;
        }
        let mut open = self.show_preferences;
        egui::Window::new("Preferences")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Run timeout");
                    ui.add(
                        egui::DragValue::new(&mut self.preferences.timeout_secs)
                            .clamp_range(1..=60)
                            .speed(1.0)
                            .suffix(" s"),
                    );
                });
                ui.horizontal(|ui| {
                    ui.label("Editor font size");
                    ui.add(
                        egui::Slider::new(&mut self.preferences.editor_font_size, 10.0..=24.0)
                            .show_value(true),
                    );
                });
            });
        self.show_preferences = open;
    }
}

impl App for JavaPadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_run_result();

        self.show_toolbar(ctx);
        self.show_status_bar(ctx);
        self.show_output_panel(ctx);
        self.show_editor(ctx);
        self.show_preferences_window(ctx);
    }
}

fn toolbar_button(ui: &mut egui::Ui, enabled: bool, text: &str, fill: Color32) -> egui::Response {
    ui.add_enabled(
        enabled,
        egui::Button::new(RichText::new(text).color(Color32::WHITE).strong()).fill(fill),
    )
}

fn highlight_layout_job(
    language: &LanguageDefinition,
    palette: &HighlightPalette,
    text: &str,
    font_size: f32,
    default_color: Color32,
) -> LayoutJob {
    let font_id = FontId::monospace(font_size);
    let default_format = TextFormat {
        font_id: font_id.clone(),
        color: default_color,
        ..Default::default()
    };

    let mut job = LayoutJob::default();
    let mut cursor = 0;
    for token in language.highlight(text) {
        if token.range.start > cursor {
            job.append(&text[cursor..token.range.start], 0.0, default_format.clone());
        }
        let style = palette.style_for(&token.kind);
        let format = TextFormat {
            font_id: font_id.clone(),
            color: Color32::from_rgb(style.foreground.r, style.foreground.g, style.foreground.b),
            italics: style.italic,
            ..Default::default()
        };
        job.append(&text[token.range.clone()], 0.0, format);
        cursor = token.range.end;
    }
    if cursor < text.len() {
        job.append(&text[cursor..], 0.0, default_format);
    }
    job
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_title(APP_TITLE),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|_cc| Box::<JavaPadApp>::default()),
    )
}

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use qagen::analyzers::{CoverageAnalyzer, CoverageReport, StandardsChecker, StandardsReport};
use qagen::config::Config;
use qagen::document_processor::DocumentProcessor;
use qagen::generators::GenerationReport;
use qagen::pipeline::{FileOutcome, GenerationPipeline, PipelineReport};

use crate::cli::Commands;

#[derive(Serialize)]
struct AnalysisOutput {
    coverage: CoverageReport,
    standards: StandardsReport,
}

pub struct App {
    pub config: Config,
    document_processor: DocumentProcessor,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            document_processor: DocumentProcessor::new(),
        })
    }

    pub async fn run_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::UiFromText {
                text,
                file,
                output,
                feature,
                base_url,
                json,
            } => {
                self.apply_session_overrides(feature, base_url);
                let text = self.get_input_text(text, file).await?;
                let output = self.output_dir(output);
                let pipeline = self.pipeline()?;

                println!("🧪 Generating UI tests into {}", output.display());
                let report = pipeline.run_ui_from_text(&text, &output).await?;
                self.print_pipeline_report(&report, json)?;
            }
            Commands::ApiFromOpenapi { spec, output, json } => {
                let output = self.output_dir(output);
                let pipeline = self.pipeline()?;

                println!("🧪 Generating API tests from {} into {}", spec.display(), output.display());
                let report = pipeline.run_api_from_spec_file(&spec, &output).await?;
                self.print_pipeline_report(&report, json)?;
            }
            Commands::UiManual {
                requirements,
                output,
                feature,
            } => {
                self.apply_session_overrides(feature, None);
                let report = self.pipeline()?.ui_manual_from_file(&requirements, &output).await?;
                self.print_generation_report("Manual UI cases", &report);
            }
            Commands::UiAuto {
                requirements,
                output,
                feature,
                base_url,
            } => {
                self.apply_session_overrides(feature, base_url);
                let report = self
                    .pipeline()?
                    .ui_automation_from_file(&requirements, &output)
                    .await?;
                self.print_generation_report("UI automation", &report);
            }
            Commands::ApiManual { spec, output } => {
                let report = self.pipeline()?.api_manual_from_file(&spec, &output).await?;
                self.print_generation_report("Manual API cases", &report);
            }
            Commands::ApiAuto { spec, output } => {
                let report = self.pipeline()?.api_automation_from_file(&spec, &output).await?;
                self.print_generation_report("API automation", &report);
            }
            Commands::Analyze { dir, output } => {
                self.analyze(&dir, output.as_deref()).await?;
            }
            Commands::Config {
                api_key,
                model,
                review_model,
                base_url,
                show,
                debug,
                validate_all,
            } => {
                if debug {
                    self.show_config_file().await?;
                    return Ok(());
                }

                if show {
                    self.show_config_status();
                    return Ok(());
                }

                if validate_all {
                    self.print_validation();
                    return Ok(());
                }

                let mut updated = false;
                if let Some(key) = api_key {
                    self.config.set_api_key(key);
                    updated = true;
                }
                if let Some(model) = model {
                    self.config.set_model(model);
                    updated = true;
                }
                if let Some(model) = review_model {
                    self.config.set_review_model(model);
                    updated = true;
                }
                if let Some(url) = base_url {
                    self.config.llm.base_url = url;
                    updated = true;
                }

                if updated {
                    self.config.save().await?;
                    println!("✅ Configuration updated successfully!");
                    self.show_config_status();
                } else {
                    println!("🔧 No configuration changes specified. Use --help for options.");
                }
            }
        }

        Ok(())
    }

    fn pipeline(&self) -> Result<GenerationPipeline> {
        GenerationPipeline::from_config(&self.config)
            .context("Run 'qagen config --api-key <key>' or export API_KEY to configure the LLM")
    }

    fn apply_session_overrides(&mut self, feature: Option<String>, base_url: Option<String>) {
        if let Some(feature) = feature {
            self.config.generation.feature = Some(feature);
        }
        if let Some(url) = base_url {
            self.config.generation.ui_base_url = url;
        }
    }

    fn output_dir(&self, output: Option<PathBuf>) -> PathBuf {
        output.unwrap_or_else(|| self.config.generation.output_dir.clone())
    }

    async fn get_input_text(&self, text: Option<String>, file: Option<PathBuf>) -> Result<String> {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            return Ok(text);
        }

        if let Some(path) = file {
            if !path.exists() {
                return Err(anyhow!("File does not exist: {}", path.display()));
            }
            println!("📖 Reading requirements from: {}", path.display());
            let content = self.document_processor.extract_text_from_file(&path).await?;
            println!("📄 Loaded {} characters from file", content.len());
            return Ok(content);
        }

        Err(anyhow!("No input provided. Pass requirement text or --file"))
    }

    async fn analyze(&self, dir: &Path, output: Option<&Path>) -> Result<()> {
        if !dir.is_dir() {
            return Err(anyhow!("Directory does not exist: {}", dir.display()));
        }

        let report = AnalysisOutput {
            coverage: CoverageAnalyzer::new()?.analyze_dir(dir)?,
            standards: StandardsChecker::new().check_dir(dir)?,
        };
        let rendered = serde_json::to_string_pretty(&report)?;

        match output {
            Some(path) => {
                fs::write(path, rendered).await?;
                println!("💾 Analysis saved to: {}", path.display());
            }
            None => {
                println!("=== COVERAGE ===");
                println!("{}", serde_json::to_string_pretty(&report.coverage)?);
                println!("=== STANDARDS ===");
                println!("{}", serde_json::to_string_pretty(&report.standards)?);
            }
        }
        Ok(())
    }

    fn print_pipeline_report(&self, report: &PipelineReport, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(report)?);
            return Ok(());
        }

        println!("\n📋 {} - {} requirement(s)", report.feature, report.requirements);
        self.print_generation_report("Manual cases", &report.manual);
        self.print_generation_report("Automated tests", &report.automation);

        println!("\n🔎 Review:");
        for review in &report.reviews {
            let line = match &review.outcome {
                FileOutcome::Missing => "⚪ missing".to_string(),
                FileOutcome::Accepted => "✅ accepted".to_string(),
                FileOutcome::Skipped { reason } => format!("⏭️  skipped ({})", reason),
                FileOutcome::Refined { attempts, problems } => {
                    format!("🛠️  rewritten x{} ({} problem(s))", attempts, problems.len())
                }
                FileOutcome::Unresolved { problems, reason } => {
                    format!("⚠️  unresolved ({} problem(s): {})", problems.len(), reason)
                }
            };
            println!("  • {}: {}", review.id, line);
        }

        if report.unresolved() > 0 {
            println!(
                "\n⚠️  {} test(s) still need attention; look for FIXME markers in the generated files.",
                report.unresolved()
            );
        }
        Ok(())
    }

    fn print_generation_report(&self, label: &str, report: &GenerationReport) {
        println!(
            "📦 {}: {} written, {} with fallback steps, {} failed",
            label,
            report.written.len(),
            report.fallbacks.len(),
            report.failed.len()
        );
        for (id, error) in &report.failed {
            eprintln!("  ❌ {}: {}", id, error);
        }
    }

    async fn show_config_file(&self) -> Result<()> {
        let config_path = Config::config_path()?;
        println!("Configuration file path: {}", config_path.display());
        println!("Config file exists: {}", config_path.exists());

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            println!("Config file size: {} bytes", content.len());
            println!("Config file content:");
            println!("{}", content);
        } else {
            println!("Config file does not exist. Creating default config...");
            self.config.save().await?;
            println!("Default config created at: {}", config_path.display());
        }
        Ok(())
    }

    fn show_config_status(&self) {
        println!("🔧 Current qagen Configuration");
        println!("=============================");
        println!("🌐 LLM base URL: {}", self.config.llm.base_url);
        if self.config.is_ai_configured() {
            println!("🔑 API Key: Configured ✅");
        } else {
            println!("🔑 API Key: Not configured ❌");
        }
        println!("🤖 Generation model: {}", self.config.llm.gen_model);
        println!("🧐 Review model: {}", self.config.llm.review_model());
        println!("⏱️  Timeout: {}s", self.config.llm.timeout);

        println!("\n📝 Generation Settings:");
        println!("  • UI base URL: {}", self.config.generation.ui_base_url);
        println!(
            "  • Feature: {}",
            self.config.generation.feature.as_deref().unwrap_or("(from requirements)")
        );
        println!("  • Output directory: {}", self.config.generation.output_dir.display());
        println!("  • Concurrency: {}", self.config.generation.concurrency);
        println!("  • Refine attempts: {}", self.config.generation.max_refine_attempts);
    }

    fn print_validation(&self) {
        println!("🔍 Validating configuration...");
        let result = self.config.validate_all_settings();
        if result.is_valid {
            println!("✅ Configuration is valid!");
        } else {
            println!("❌ Configuration issues found:");
            for issue in &result.issues {
                println!("   • {}", issue);
            }
        }
        if !result.warnings.is_empty() {
            println!("⚠️  Warnings:");
            for warning in &result.warnings {
                println!("   • {}", warning);
            }
        }
    }
}

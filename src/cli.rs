use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qagen")]
#[command(about = "🧪 qagen - AI-assisted QA test generator")]
#[command(long_about = "qagen turns UI requirements and OpenAPI specifications into manual Allure test cases and pytest automation, then reviews and rewrites weak automated tests.

QUICK START:
  qagen ui-from-text --file requirements.md                 # Manual + Playwright tests from text
  qagen api-from-openapi --spec compute.yaml                # Manual + requests tests from OpenAPI
  qagen analyze generated/auto_ui                           # Coverage and standards report
  qagen config --api-key \"your-key\"                         # Store the LLM API key

OUTPUT LAYOUT:
  <output>/manual_ui  <output>/auto_ui  <output>/manual_api  <output>/auto_api")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate manual and automated UI tests from free-form requirement text")]
    #[command(long_about = "Extract structured requirements from free-form text with the LLM, write manual Allure cases and Playwright tests, then review and refine the automated tests.

INPUT OPTIONS (choose one):
  <TEXT>     Requirement text in quotes
  --file     Requirements document (.txt, .md, .rst, .pdf, .docx, .xlsx)

EXAMPLES:
  qagen ui-from-text \"The calculator shows the monthly total\"
  qagen ui-from-text --file requirements.docx --output out --feature \"Price Calculator\"")]
    UiFromText {
        #[arg(help = "Requirement text (use quotes for multi-word text)")]
        text: Option<String>,

        #[arg(short, long, help = "Requirements document to read")]
        file: Option<PathBuf>,

        #[arg(short, long, help = "Output directory (defaults to generation.output_dir)")]
        output: Option<PathBuf>,

        #[arg(long, help = "Product name used as the Allure feature")]
        feature: Option<String>,

        #[arg(long, help = "URL the Playwright tests open (defaults to generation.ui_base_url)")]
        base_url: Option<String>,

        #[arg(long, help = "Print the run report as JSON")]
        json: bool,
    },

    #[command(about = "Generate manual and automated API tests from an OpenAPI specification")]
    #[command(long_about = "Parse an OpenAPI 3 document (YAML or JSON), keep the VMs, Disks and Flavors operations, write manual Allure cases and pytest + requests tests, then review and refine the automated tests.

EXAMPLES:
  qagen api-from-openapi --spec compute.yaml
  qagen api-from-openapi --spec compute.json --output out --json")]
    ApiFromOpenapi {
        #[arg(short, long, help = "OpenAPI specification file (.yaml, .yml or .json)")]
        spec: PathBuf,

        #[arg(short, long, help = "Output directory (defaults to generation.output_dir)")]
        output: Option<PathBuf>,

        #[arg(long, help = "Print the run report as JSON")]
        json: bool,
    },

    #[command(about = "Write manual UI cases from a structured requirements YAML file")]
    UiManual {
        #[arg(short, long, help = "Requirements YAML file ({feature, requirements: [...]})")]
        requirements: PathBuf,

        #[arg(short, long, help = "Directory for the generated cases")]
        output: PathBuf,

        #[arg(long, help = "Override the feature name from the file")]
        feature: Option<String>,
    },

    #[command(about = "Write Playwright UI tests from a structured requirements YAML file")]
    UiAuto {
        #[arg(short, long, help = "Requirements YAML file ({feature, requirements: [...]})")]
        requirements: PathBuf,

        #[arg(short, long, help = "Directory for the generated tests")]
        output: PathBuf,

        #[arg(long, help = "Override the feature name from the file")]
        feature: Option<String>,

        #[arg(long, help = "URL the Playwright tests open")]
        base_url: Option<String>,
    },

    #[command(about = "Write manual API cases from an OpenAPI specification")]
    ApiManual {
        #[arg(short, long, help = "OpenAPI specification file")]
        spec: PathBuf,

        #[arg(short, long, help = "Directory for the generated cases")]
        output: PathBuf,
    },

    #[command(about = "Write pytest API tests from an OpenAPI specification")]
    ApiAuto {
        #[arg(short, long, help = "OpenAPI specification file")]
        spec: PathBuf,

        #[arg(short, long, help = "Directory for the generated tests")]
        output: PathBuf,
    },

    #[command(about = "Report test counts and Allure standards violations for a directory")]
    #[command(long_about = "Scan test_*.py files: count test functions (scope API when the path mentions api, UI otherwise) and flag files missing @allure.title, a priority label or any of the Arrange/Act/Assert steps.

EXAMPLES:
  qagen analyze generated/auto_ui
  qagen analyze generated/manual_api --output report.json")]
    Analyze {
        #[arg(help = "Directory with generated tests")]
        dir: PathBuf,

        #[arg(short, long, help = "Save the JSON report to a file")]
        output: Option<PathBuf>,
    },

    #[command(about = "Show and change LLM configuration")]
    #[command(long_about = "Configure the OpenAI-compatible LLM endpoint used for generation and review.

Settings are read from ~/.qagen/config.yml, ./qagen.yml and QAGEN__SECTION__KEY environment variables. API_KEY / EVOLUTION_API_KEY, EVOLUTION_GEN_MODEL and EVOLUTION_REVIEW_MODEL are honoured as well.

EXAMPLES:
  qagen config --api-key \"your-key\" --model \"openai/gpt-oss-120b\"
  qagen config --review-model \"openai/gpt-oss-120b\"
  qagen config --show
  qagen config --validate-all

CONFIGURATION FILE: ~/.qagen/config.yml")]
    Config {
        #[arg(short, long, help = "Set the LLM API key")]
        api_key: Option<String>,

        #[arg(short, long, help = "Set the generation model")]
        model: Option<String>,

        #[arg(long, help = "Set the review model (defaults to the generation model)")]
        review_model: Option<String>,

        #[arg(long, help = "Set the LLM base URL")]
        base_url: Option<String>,

        #[arg(long, help = "Display current configuration values")]
        show: bool,

        #[arg(long, help = "Show config file location, status, and create it if missing")]
        debug: bool,

        #[arg(long, help = "Validate all configuration settings")]
        validate_all: bool,
    },
}

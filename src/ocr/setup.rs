use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[cfg(windows)]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];
#[cfg(not(windows))]
const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: Option<PathBuf>,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plate-scanner")
        .join("tesseract")
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Ensures Tesseract and the language data are available.
///
/// The executable has to be installed by the user. Missing language data is
/// downloaded into the local tessdata directory.
pub fn ensure_tesseract(language: &str) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable()?;
    log(&format!("Tesseract executable: {}", executable.display()));

    if let Some(tessdata) = find_tessdata_dir(language) {
        log(&format!("Tessdata found at: {}", tessdata.display()));
        return Ok(TesseractPaths {
            executable,
            tessdata: Some(tessdata),
        });
    }

    if tesseract_knows_language(&executable, language) {
        log(&format!(
            "Tesseract reports '{}' in its default tessdata",
            language
        ));
        return Ok(TesseractPaths {
            executable,
            tessdata: None,
        });
    }

    log(&format!("{} not found locally, downloading...", traineddata_name(language)));

    let tessdata = get_tesseract_dir().join("tessdata");
    fs::create_dir_all(&tessdata)?;
    download_tessdata(&tessdata, language)?;

    log(&format!("Tesseract ready with tessdata at: {}", tessdata.display()));

    Ok(TesseractPaths {
        executable,
        tessdata: Some(tessdata),
    })
}

/// Asks the executable which languages it can load from its default location.
fn tesseract_knows_language(executable: &Path, language: &str) -> bool {
    std::process::Command::new(executable)
        .arg("--list-langs")
        .output()
        .map(|output| {
            output.status.success()
                && String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .any(|line| line.trim() == language)
        })
        .unwrap_or(false)
}

/// Downloads `<language>.traineddata` from the tessdata repository.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file_name = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    let target = tessdata_dir.join(&file_name);

    log(&format!("Downloading {}...", url));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "plate-scanner")
        .send()
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(&bytes)?;

    log(&format!("Downloaded {} ({} bytes)", file_name, bytes.len()));

    Ok(())
}

/// Finds the Tesseract executable, checking our local dir first, then
/// `PATH`, then common install locations.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for dir in COMMON_INSTALL_DIRS {
        let p = Path::new(dir).join(EXECUTABLE_NAME);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and make sure it is on PATH, \
         or copy it to: {}",
        get_tesseract_dir().display()
    ))
}

/// Finds a tessdata directory containing `<language>.traineddata`.
///
/// Order: our local dir, `TESSDATA_PREFIX` (and its `tessdata` child), then
/// system locations.
pub fn find_tessdata_dir(language: &str) -> Option<PathBuf> {
    let file_name = traineddata_name(language);
    let has_language = |dir: &Path| dir.join(&file_name).exists();

    let local_tessdata = get_tesseract_dir().join("tessdata");
    if has_language(&local_tessdata) {
        return Some(local_tessdata);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if has_language(&p) {
            return Some(p);
        }
        let p = p.join("tessdata");
        if has_language(&p) {
            return Some(p);
        }
    }

    SYSTEM_TESSDATA_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|p| has_language(p))
}

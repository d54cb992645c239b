use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use leptess::capi;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::language::LanguageSet;

use super::{EngineFactory, EngineParam, EngineSession, RawRecognition};

/// Opens a fresh Tesseract instance per call through leptess' C bindings.
///
/// `LepTess::new` initializes without variables, which leaves init-only
/// parameters such as `load_system_dawg` at their defaults. Opening through
/// `TessBaseAPIInit4` lets them take effect.
#[derive(Debug, Clone, Default)]
pub struct TesseractFactory {
    data_path: Option<String>,
}

impl TesseractFactory {
    /// `data_path` is the tessdata directory; `None` uses Tesseract's default lookup.
    pub fn new(data_path: Option<String>) -> Self {
        Self { data_path }
    }
}

impl EngineFactory for TesseractFactory {
    fn open(
        &self,
        languages: &LanguageSet,
        init_params: &[(EngineParam, &str)],
    ) -> Result<Box<dyn EngineSession>> {
        let lang = languages.to_tesseract_string();
        let init_error = |reason: String| PipelineError::EngineInit {
            languages: lang.clone(),
            reason,
        };

        let data_path = self
            .data_path
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|e| init_error(format!("invalid tessdata path: {e}")))?;
        let lang_c = CString::new(lang.as_str())
            .map_err(|e| init_error(format!("invalid language string: {e}")))?;
        let (names, values) = init_vars(init_params)?;

        let api = TessHandle::create();
        api.init(data_path.as_deref(), &lang_c, &names, &values)
            .map_err(init_error)?;

        info!(
            languages = %lang,
            init_params = init_params.len(),
            "Tesseract OCR initialized"
        );
        Ok(Box::new(TesseractSession { api: Some(api) }))
    }
}

/// Splits init parameters into the parallel name/value arrays `Init4` takes.
fn init_vars(params: &[(EngineParam, &str)]) -> Result<(Vec<CString>, Vec<CString>)> {
    let mut names = Vec::with_capacity(params.len());
    let mut values = Vec::with_capacity(params.len());
    for (param, value) in params {
        names.push(c_string(param.name())?);
        values.push(c_string(value)?);
    }
    Ok((names, values))
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|e| PipelineError::InvalidSettings(format!("value contains a NUL byte: {e}")))
}

/// Owned `TessBaseAPI` pointer, ended and deleted on drop.
struct TessHandle(*mut capi::TessBaseAPI);

// The handle is only ever used by one thread at a time through `&mut`.
unsafe impl Send for TessHandle {}

impl TessHandle {
    fn create() -> Self {
        Self(unsafe { capi::TessBaseAPICreate() })
    }

    fn init(
        &self,
        data_path: Option<&CStr>,
        language: &CStr,
        names: &[CString],
        values: &[CString],
    ) -> std::result::Result<(), String> {
        let mut name_ptrs: Vec<*mut c_char> =
            names.iter().map(|n| n.as_ptr() as *mut c_char).collect();
        let mut value_ptrs: Vec<*mut c_char> =
            values.iter().map(|v| v.as_ptr() as *mut c_char).collect();

        // Tesseract reads the arrays during the call and does not keep them.
        let code = unsafe {
            capi::TessBaseAPIInit4(
                self.0,
                data_path.map(CStr::as_ptr).unwrap_or_else(ptr::null),
                language.as_ptr(),
                capi::TessOcrEngineMode_OEM_DEFAULT,
                ptr::null_mut(),
                0,
                name_ptrs.as_mut_ptr(),
                value_ptrs.as_mut_ptr(),
                name_ptrs.len(),
                0,
            )
        };
        if code == 0 {
            Ok(())
        } else {
            Err(format!("TessBaseAPIInit4 returned {code}"))
        }
    }

    fn set_variable(&mut self, name: &CStr, value: &CStr) -> bool {
        unsafe { capi::TessBaseAPISetVariable(self.0, name.as_ptr(), value.as_ptr()) == 1 }
    }

    /// Tesseract copies the pixels before returning.
    fn set_gray_image(&mut self, pixels: &[u8], width: i32, height: i32) {
        unsafe { capi::TessBaseAPISetImage(self.0, pixels.as_ptr(), width, height, 1, width) }
    }

    fn utf8_text(&mut self) -> std::result::Result<String, String> {
        let raw = unsafe { capi::TessBaseAPIGetUTF8Text(self.0) };
        if raw.is_null() {
            return Err("engine returned no text".to_string());
        }
        let text = unsafe { CStr::from_ptr(raw) }
            .to_str()
            .map(str::to_string)
            .map_err(|e| format!("engine returned invalid UTF-8: {e}"));
        unsafe { capi::TessDeleteText(raw) };
        text
    }

    fn mean_text_conf(&self) -> i32 {
        unsafe { capi::TessBaseAPIMeanTextConf(self.0) }
    }
}

impl Drop for TessHandle {
    fn drop(&mut self) {
        unsafe {
            capi::TessBaseAPIEnd(self.0);
            capi::TessBaseAPIDelete(self.0);
        }
    }
}

struct TesseractSession {
    api: Option<TessHandle>,
}

impl TesseractSession {
    fn engine(&mut self) -> Result<&mut TessHandle> {
        self.api.as_mut().ok_or(PipelineError::InvalidState {
            operation: "use",
            state: "closed",
        })
    }
}

impl EngineSession for TesseractSession {
    fn set_param(&mut self, param: EngineParam, value: &str) -> Result<()> {
        let name = c_string(param.name())?;
        let value_c = c_string(value)?;
        if self.engine()?.set_variable(&name, &value_c) {
            Ok(())
        } else {
            Err(PipelineError::EngineConfig {
                param: param.name(),
                reason: format!("Tesseract refused value '{value}'"),
            })
        }
    }

    fn recognize(&mut self, image: &[u8], progress: &mut dyn FnMut(u8)) -> Result<RawRecognition> {
        let gray = image::load_from_memory(image)
            .map_err(|e| PipelineError::Recognition(format!("Failed to set image: {e}")))?
            .to_luma8();
        let (width, height) = gray.dimensions();
        let width = i32::try_from(width)
            .map_err(|_| PipelineError::Recognition("image too wide".to_string()))?;
        let height = i32::try_from(height)
            .map_err(|_| PipelineError::Recognition("image too tall".to_string()))?;

        let api = self.engine()?;
        api.set_gray_image(gray.as_raw(), width, height);
        progress(20);

        let text = api
            .utf8_text()
            .map_err(|e| PipelineError::Recognition(format!("Failed to extract text: {e}")))?;
        progress(90);

        let confidence = api.mean_text_conf();
        debug!(chars = text.len(), confidence, "Tesseract recognition finished");

        Ok(RawRecognition {
            text,
            confidence: confidence as f32,
        })
    }

    fn close(&mut self) {
        if self.api.take().is_some() {
            debug!("Tesseract instance released");
        }
    }
}

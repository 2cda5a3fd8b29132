use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::error::RouterError;

fn to_py_err(err: RouterError) -> PyErr {
    match err {
        RouterError::Config(_) | RouterError::InvalidUri(_) => {
            PyValueError::new_err(err.to_string())
        }
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

#[pyfunction]
#[pyo3(signature = (
    project_id,
    location,
    processor_id,
    file_storage_bucket,
    file_path,
    mime_type,
    field_mask = Some("entities".to_string()),
    processor_version_id = None,
))]
#[allow(clippy::too_many_arguments)]
fn is_form(
    py: Python<'_>,
    project_id: &str,
    location: &str,
    processor_id: &str,
    file_storage_bucket: &str,
    file_path: &str,
    mime_type: &str,
    field_mask: Option<String>,
    processor_version_id: Option<String>,
) -> PyResult<bool> {
    // Network calls block; let other Python threads run meanwhile.
    py.allow_threads(|| {
        crate::is_form(
            project_id,
            location,
            processor_id,
            file_storage_bucket,
            file_path,
            mime_type,
            field_mask.as_deref(),
            processor_version_id.as_deref(),
        )
    })
    .map_err(to_py_err)
}

/// `is_form` for a `gs://bucket/path` PDF URI.
#[pyfunction]
#[pyo3(signature = (project_id, location, processor_id, uri, processor_version_id = None))]
fn is_form_uri(
    py: Python<'_>,
    project_id: &str,
    location: &str,
    processor_id: &str,
    uri: &str,
    processor_version_id: Option<String>,
) -> PyResult<bool> {
    py.allow_threads(|| {
        crate::is_form_uri(
            project_id,
            location,
            processor_id,
            uri,
            processor_version_id.as_deref(),
        )
    })
    .map_err(to_py_err)
}

/// Returns a list of `{source_object, destination_bucket, destination_object}` dicts.
#[pyfunction]
#[pyo3(signature = (processor_id, project_id, location, process_bucket, process_folder))]
fn get_forms_list<'py>(
    py: Python<'py>,
    processor_id: Option<String>,
    project_id: &str,
    location: Option<String>,
    process_bucket: &str,
    process_folder: &str,
) -> PyResult<Vec<Bound<'py, PyDict>>> {
    let records = py
        .allow_threads(|| {
            crate::get_forms_list(
                processor_id.as_deref(),
                project_id,
                location.as_deref(),
                process_bucket,
                process_folder,
            )
        })
        .map_err(to_py_err)?;

    records
        .into_iter()
        .map(|record| {
            let dict = PyDict::new_bound(py);
            dict.set_item("source_object", record.source_object)?;
            dict.set_item("destination_bucket", record.destination_bucket)?;
            dict.set_item("destination_object", record.destination_object)?;
            Ok(dict)
        })
        .collect()
}

// PyO3 module definition - exposes the classifier to the workflow
#[pymodule]
fn form_router(m: &Bound<'_, PyModule>) -> PyResult<()> {
    crate::init_tracing();

    m.add_function(wrap_pyfunction!(is_form, m)?)?;
    m.add_function(wrap_pyfunction!(is_form_uri, m)?)?;
    m.add_function(wrap_pyfunction!(get_forms_list, m)?)?;

    Ok(())
}

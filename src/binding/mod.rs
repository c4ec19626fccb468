pub mod classes;
pub mod functions;

use classes::{PyAblator, PyFle, PyPointBasedRegistration, PyRegistrationResult, PySimulationSummary};
use functions::*;
use pyo3::exceptions::{
    PyArithmeticError, PyNotImplementedError, PyRuntimeError, PyTypeError, PyValueError,
};
use pyo3::prelude::*;

use crate::error::FredError;

impl From<FredError> for PyErr {
    fn from(err: FredError) -> PyErr {
        let message = err.to_string();
        match err {
            FredError::InvalidValue(_) => PyValueError::new_err(message),
            FredError::InvalidType(_) => PyTypeError::new_err(message),
            FredError::NotImplemented(_) => PyNotImplementedError::new_err(message),
            FredError::Degenerate(_) => PyArithmeticError::new_err(message),
            FredError::Uninitialised | FredError::Procrustes(_) => {
                PyRuntimeError::new_err(message)
            }
        }
    }
}

#[pymodule]
fn fredrs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(expected_absolute_value, m)?)?;
    m.add_function(wrap_pyfunction!(expected_squared_value, m)?)?;
    m.add_function(wrap_pyfunction!(compute_fre_2d, m)?)?;
    m.add_function(wrap_pyfunction!(compute_tre_from_fle_2d, m)?)?;
    m.add_function(wrap_pyfunction!(sphere_volume, m)?)?;
    m.add_function(wrap_pyfunction!(two_sphere_overlap_volume, m)?)?;
    m.add_function(wrap_pyfunction!(distance_from_line, m)?)?;
    m.add_function(wrap_pyfunction!(multiply_points_by_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(make_target_point, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_registration, m)?)?;
    m.add_function(wrap_pyfunction!(run_simulation_py, m)?)?;

    m.add_class::<PyFle>()?;
    m.add_class::<PyPointBasedRegistration>()?;
    m.add_class::<PyRegistrationResult>()?;
    m.add_class::<PyAblator>()?;
    m.add_class::<PySimulationSummary>()?;
    Ok(())
}

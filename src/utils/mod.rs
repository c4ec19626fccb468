pub mod vector_math;

#[cfg(test)]
pub mod test_utils;

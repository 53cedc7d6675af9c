pub mod coding; // ICD/CPT code prediction with grounded evidence spans
pub mod diagnostic; // Request diagnostic dump (MEDCODER_DUMP_DIR)

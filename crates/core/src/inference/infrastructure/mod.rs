pub mod ort_session;

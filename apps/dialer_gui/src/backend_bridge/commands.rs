//! Backend commands queued from UI to backend worker.

pub enum BackendCommand {
    InitiateCall { phone_input: String },
    CancelCall,
}

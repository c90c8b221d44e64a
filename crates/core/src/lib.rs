pub mod shared {
    pub mod config;
    pub mod constants;
    pub mod frame;
    pub mod paths;
}

pub mod models {
    pub mod domain {
        pub mod asset_provisioner;
        pub mod model_descriptor;
    }
    pub mod infrastructure;
}

pub mod inference {
    pub mod domain {
        pub mod inference_session;
    }
    pub mod infrastructure;
    pub mod inference_pool;
    pub mod thread_gate;
}

pub mod analysis {
    pub mod content_analyser;
    pub mod memo_cache;
    pub mod preprocess;
    pub mod score_extractor;
    pub mod stream_sampler;
}

pub mod video {
    pub mod domain {
        pub mod vision_reader;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod scan_media_use_case;
    pub mod scan_stream_use_case;
}

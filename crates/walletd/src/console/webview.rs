//! Native console view backed by `tao` windows and `wry` web views.

use std::sync::{Arc, Mutex, PoisonError};

use tao::dpi::LogicalSize;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use tao::platform::run_return::EventLoopExtRunReturn;
use tao::window::{Window, WindowBuilder};
use tracing::debug;
use wry::{WebView, WebViewBuilder};

use super::{
    CONSOLE_TARGET, ConsoleView, SizeHint, ViewError, ViewFactory, ViewSpec, ViewTerminator,
};

#[derive(Debug, Clone, Copy)]
enum ConsoleEvent {
    Terminate,
}

/// Builds `wry` console views.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebviewFactory;

impl WebviewFactory {
    /// Creates the factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ViewFactory for WebviewFactory {
    fn create(&self, spec: &ViewSpec) -> Result<Box<dyn ConsoleView>, ViewError> {
        let event_loop = EventLoopBuilder::<ConsoleEvent>::with_user_event().build();
        let window = build_window(spec, &event_loop)?;
        let webview = build_webview(spec, &window)?;
        let terminator = Arc::new(WebviewTerminator {
            proxy: Mutex::new(event_loop.create_proxy()),
        });
        Ok(Box::new(WebviewConsole {
            _webview: webview,
            window,
            event_loop,
            terminator,
        }))
    }
}

fn build_window(
    spec: &ViewSpec,
    event_loop: &EventLoop<ConsoleEvent>,
) -> Result<Window, ViewError> {
    let size = LogicalSize::new(f64::from(spec.width), f64::from(spec.height));
    let builder = WindowBuilder::new()
        .with_title(spec.title.as_str())
        .with_inner_size(size);
    let builder = match spec.hint {
        SizeHint::None => builder,
        SizeHint::Min => builder.with_min_inner_size(size),
        SizeHint::Max => builder.with_max_inner_size(size),
        SizeHint::Fixed => builder.with_resizable(false),
    };
    builder.build(event_loop).map_err(|error| ViewError::Create {
        message: error.to_string(),
    })
}

fn build_webview(spec: &ViewSpec, window: &Window) -> Result<WebView, ViewError> {
    let builder = WebViewBuilder::new().with_url(spec.url.as_str());

    #[cfg(target_os = "linux")]
    let built = {
        use tao::platform::unix::WindowExtUnix;
        use wry::WebViewBuilderExtUnix;

        let Some(container) = window.default_vbox() else {
            return Err(ViewError::Create {
                message: "window has no GTK container".to_owned(),
            });
        };
        builder.build_gtk(container)
    };
    #[cfg(not(target_os = "linux"))]
    let built = builder.build(window);

    built.map_err(|error| ViewError::Create {
        message: error.to_string(),
    })
}

struct WebviewTerminator {
    proxy: Mutex<EventLoopProxy<ConsoleEvent>>,
}

impl ViewTerminator for WebviewTerminator {
    fn terminate(&self) {
        let proxy = self.proxy.lock().unwrap_or_else(PoisonError::into_inner);
        if proxy.send_event(ConsoleEvent::Terminate).is_err() {
            debug!(target: CONSOLE_TARGET, "console view already closed");
        }
    }
}

// Field order matters: the web view must be dropped before its window.
struct WebviewConsole {
    _webview: WebView,
    window: Window,
    event_loop: EventLoop<ConsoleEvent>,
    terminator: Arc<WebviewTerminator>,
}

impl ConsoleView for WebviewConsole {
    fn terminator(&self) -> Arc<dyn ViewTerminator> {
        self.terminator.clone()
    }

    fn run(&mut self) -> Result<(), ViewError> {
        let window_id = self.window.id();
        self.event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Wait;
            match event {
                Event::WindowEvent {
                    window_id: id,
                    event: WindowEvent::CloseRequested,
                    ..
                } if id == window_id => *control_flow = ControlFlow::Exit,
                Event::UserEvent(ConsoleEvent::Terminate) => *control_flow = ControlFlow::Exit,
                _ => {}
            }
        });
        Ok(())
    }
}

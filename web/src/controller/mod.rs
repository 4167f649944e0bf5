pub(crate) mod webhook_controller;

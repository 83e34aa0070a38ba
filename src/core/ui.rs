/// Blocking user interaction the panels need: alerts and yes/no confirmations.
pub trait Ui {
    fn alert(&mut self, message: &str);
    fn confirm(&mut self, message: &str) -> bool;
}

impl<U: Ui + ?Sized> Ui for &mut U {
    fn alert(&mut self, message: &str) {
        (**self).alert(message)
    }

    fn confirm(&mut self, message: &str) -> bool {
        (**self).confirm(message)
    }
}

//! Local Prompts
//!
//! Spoken lines the server produces itself: the greeting, completion
//! acknowledgments, and re-asks used when the oracle gives nothing usable.
//! Every supported language family has a table; anything else gets English.

use auraforming_core::{group_options, FieldDescriptor, FieldKind, Language};

/// Prompt table for one language family
#[derive(Debug)]
pub struct Prompts {
    first: &'static str,
    already_complete: &'static str,
    all_collected: &'static str,
    advance: &'static str,
    barge_in: &'static str,
    clarify: &'static str,
    question: &'static str,
    options: &'static str,
    multi_options: &'static str,
    yes_no: &'static str,
    list_separator: &'static str,
}

const EN: Prompts = Prompts {
    first: "Hi there. I will help you complete this form one step at a time. Let's start with {field}. What should I enter?",
    already_complete: "Thanks. I have all required information.",
    all_collected: "Thanks. We have all missing fields now.",
    advance: "Great, now let's do {field}.",
    barge_in: "Got it. Let's continue with {field}.",
    clarify: "I still need {field}. Could you clarify that?",
    question: "What should I enter for {field}?",
    options: "The options are: {options}.",
    multi_options: "You can choose one or more of: {options}.",
    yes_no: "Please answer yes or no.",
    list_separator: ", ",
};

const ES: Prompts = Prompts {
    first: "Hola. Le ayudaré a completar este formulario paso a paso. Empecemos con {field}. ¿Qué debo escribir?",
    already_complete: "Gracias. Ya tengo toda la información necesaria.",
    all_collected: "Gracias. Ya tenemos todos los campos pendientes.",
    advance: "Perfecto, ahora sigamos con {field}.",
    barge_in: "Entendido. Sigamos con {field}.",
    clarify: "Todavía necesito {field}. ¿Podría aclararlo?",
    question: "¿Qué debo poner en {field}?",
    options: "Las opciones son: {options}.",
    multi_options: "Puede elegir una o varias de estas opciones: {options}.",
    yes_no: "Por favor, responda sí o no.",
    list_separator: ", ",
};

const FR: Prompts = Prompts {
    first: "Bonjour. Je vais vous aider à remplir ce formulaire étape par étape. Commençons par {field}. Que dois-je indiquer ?",
    already_complete: "Merci. J'ai toutes les informations nécessaires.",
    all_collected: "Merci. Nous avons maintenant tous les champs manquants.",
    advance: "Parfait, passons maintenant à {field}.",
    barge_in: "Compris. Continuons avec {field}.",
    clarify: "J'ai encore besoin de {field}. Pouvez-vous préciser ?",
    question: "Que dois-je indiquer pour {field} ?",
    options: "Les options sont : {options}.",
    multi_options: "Vous pouvez choisir une ou plusieurs options parmi : {options}.",
    yes_no: "Merci de répondre par oui ou par non.",
    list_separator: ", ",
};

const DE: Prompts = Prompts {
    first: "Hallo. Ich helfe Ihnen, dieses Formular Schritt für Schritt auszufüllen. Beginnen wir mit {field}. Was soll ich eintragen?",
    already_complete: "Danke. Ich habe alle erforderlichen Angaben.",
    all_collected: "Danke. Jetzt haben wir alle fehlenden Felder.",
    advance: "Super, jetzt kommt {field}.",
    barge_in: "Verstanden. Machen wir mit {field} weiter.",
    clarify: "Ich brauche noch {field}. Können Sie das bitte präzisieren?",
    question: "Was soll ich bei {field} eintragen?",
    options: "Die Optionen sind: {options}.",
    multi_options: "Sie können eine oder mehrere Optionen wählen: {options}.",
    yes_no: "Bitte antworten Sie mit Ja oder Nein.",
    list_separator: ", ",
};

const IT: Prompts = Prompts {
    first: "Ciao. Ti aiuterò a compilare questo modulo un passo alla volta. Iniziamo con {field}. Cosa devo inserire?",
    already_complete: "Grazie. Ho tutte le informazioni necessarie.",
    all_collected: "Grazie. Ora abbiamo tutti i campi mancanti.",
    advance: "Ottimo, ora passiamo a {field}.",
    barge_in: "Capito. Continuiamo con {field}.",
    clarify: "Ho ancora bisogno di {field}. Puoi chiarire?",
    question: "Cosa devo inserire per {field}?",
    options: "Le opzioni sono: {options}.",
    multi_options: "Puoi scegliere una o più opzioni tra: {options}.",
    yes_no: "Rispondi sì o no, per favore.",
    list_separator: ", ",
};

const PT: Prompts = Prompts {
    first: "Olá. Vou ajudar você a preencher este formulário passo a passo. Vamos começar com {field}. O que devo preencher?",
    already_complete: "Obrigado. Já tenho todas as informações necessárias.",
    all_collected: "Obrigado. Agora temos todos os campos pendentes.",
    advance: "Ótimo, agora vamos para {field}.",
    barge_in: "Entendi. Vamos continuar com {field}.",
    clarify: "Ainda preciso de {field}. Pode esclarecer?",
    question: "O que devo preencher em {field}?",
    options: "As opções são: {options}.",
    multi_options: "Você pode escolher uma ou mais opções entre: {options}.",
    yes_no: "Por favor, responda sim ou não.",
    list_separator: ", ",
};

const JA: Prompts = Prompts {
    first: "こんにちは。このフォームを一つずつ一緒に入力していきます。まず{field}から始めましょう。何と入力しますか？",
    already_complete: "ありがとうございます。必要な情報はすべて揃っています。",
    all_collected: "ありがとうございます。未入力の項目はすべて揃いました。",
    advance: "ありがとうございます。次は{field}です。",
    barge_in: "承知しました。{field}に戻りましょう。",
    clarify: "{field}がまだ必要です。もう一度教えていただけますか？",
    question: "{field}には何と入力しますか？",
    options: "選択肢は次のとおりです：{options}。",
    multi_options: "次の中から一つ以上選べます：{options}。",
    yes_no: "はいかいいえでお答えください。",
    list_separator: "、",
};

const KO: Prompts = Prompts {
    first: "안녕하세요. 이 양식을 한 단계씩 작성하도록 도와드리겠습니다. {field}부터 시작하겠습니다. 무엇을 입력할까요?",
    already_complete: "감사합니다. 필요한 정보를 모두 받았습니다.",
    all_collected: "감사합니다. 빠진 항목을 모두 채웠습니다.",
    advance: "좋습니다. 이제 {field} 항목입니다.",
    barge_in: "알겠습니다. {field} 항목을 계속하겠습니다.",
    clarify: "아직 {field} 정보가 필요합니다. 다시 말씀해 주시겠어요?",
    question: "{field}에는 무엇을 입력할까요?",
    options: "선택지는 다음과 같습니다: {options}.",
    multi_options: "다음 중 하나 이상을 선택할 수 있습니다: {options}.",
    yes_no: "예 또는 아니요로 답해 주세요.",
    list_separator: ", ",
};

const RU: Prompts = Prompts {
    first: "Здравствуйте. Я помогу заполнить эту форму шаг за шагом. Начнём с поля {field}. Что мне указать?",
    already_complete: "Спасибо. У меня есть вся необходимая информация.",
    all_collected: "Спасибо. Теперь все недостающие поля заполнены.",
    advance: "Отлично, теперь перейдём к полю {field}.",
    barge_in: "Понятно. Продолжим с полем {field}.",
    clarify: "Мне всё ещё нужно поле {field}. Не могли бы вы уточнить?",
    question: "Что указать в поле {field}?",
    options: "Варианты: {options}.",
    multi_options: "Можно выбрать один или несколько вариантов: {options}.",
    yes_no: "Пожалуйста, ответьте да или нет.",
    list_separator: ", ",
};

const ZH: Prompts = Prompts {
    first: "您好。我会一步一步帮您填写这份表格。我们先从{field}开始。我应该填写什么？",
    already_complete: "谢谢。我已经拿到所有需要的信息。",
    all_collected: "谢谢。所有缺少的字段现在都已填写。",
    advance: "好的，接下来是{field}。",
    barge_in: "明白了。我们继续{field}。",
    clarify: "我还需要{field}。您能再说明一下吗？",
    question: "{field}应该填写什么？",
    options: "可选项有：{options}。",
    multi_options: "您可以从以下选项中选择一个或多个：{options}。",
    yes_no: "请回答是或否。",
    list_separator: "、",
};

const HI: Prompts = Prompts {
    first: "नमस्ते। मैं यह फ़ॉर्म एक-एक कदम भरने में आपकी मदद करूँगा। चलिए {field} से शुरू करते हैं। मुझे क्या भरना चाहिए?",
    already_complete: "धन्यवाद। मेरे पास सारी ज़रूरी जानकारी है।",
    all_collected: "धन्यवाद। अब सभी बाकी फ़ील्ड भर गए हैं।",
    advance: "बढ़िया, अब {field} पर चलते हैं।",
    barge_in: "समझ गया। चलिए {field} के साथ आगे बढ़ते हैं।",
    clarify: "मुझे अभी भी {field} चाहिए। क्या आप इसे स्पष्ट कर सकते हैं?",
    question: "{field} में मुझे क्या भरना चाहिए?",
    options: "विकल्प हैं: {options}।",
    multi_options: "आप इनमें से एक या अधिक चुन सकते हैं: {options}।",
    yes_no: "कृपया हाँ या नहीं में जवाब दें।",
    list_separator: ", ",
};

impl Prompts {
    /// Table for a session language
    pub fn for_language(language: &Language) -> &'static Prompts {
        match language.family() {
            "es" => &ES,
            "fr" => &FR,
            "de" => &DE,
            "it" => &IT,
            "pt" => &PT,
            "ja" => &JA,
            "ko" => &KO,
            "ru" => &RU,
            "zh" => &ZH,
            "hi" => &HI,
            _ => &EN,
        }
    }

    pub fn first_prompt(&self, label: &str) -> String {
        self.first.replace("{field}", label)
    }

    /// Reply to any turn on an already completed session
    pub fn already_complete(&self) -> String {
        self.already_complete.to_string()
    }

    /// Reply when the last field was just accepted
    pub fn all_collected(&self) -> String {
        self.all_collected.to_string()
    }

    pub fn advance(&self, next_label: &str) -> String {
        self.advance.replace("{field}", next_label)
    }

    pub fn barge_in(&self, label: &str) -> String {
        self.barge_in.replace("{field}", label)
    }

    /// Re-ask the current field, listing what a valid answer looks like
    pub fn clarify(&self, label: &str, group: &[&FieldDescriptor]) -> String {
        let mut text = self.clarify.replace("{field}", label);
        if let Some(hint) = self.answer_hint(group) {
            text.push(' ');
            text.push_str(&hint);
        }
        text
    }

    /// Stand-alone question for a field or group, with its answer hint
    pub fn question(&self, label: &str, group: &[&FieldDescriptor]) -> String {
        let mut text = self.question.replace("{field}", label);
        if let Some(hint) = self.answer_hint(group) {
            text.push(' ');
            text.push_str(&hint);
        }
        text
    }

    fn answer_hint(&self, group: &[&FieldDescriptor]) -> Option<String> {
        let first = group.first()?;
        if group.len() > 1 {
            let options = group_options(group);
            return (!options.is_empty())
                .then(|| self.multi_options.replace("{options}", &options.join(self.list_separator)));
        }
        match first.kind {
            FieldKind::Text => None,
            FieldKind::Boolean if first.has_default_boolean_options() => {
                Some(self.yes_no.to_string())
            }
            _ if first.options.is_empty() => None,
            _ => Some(
                self.options
                    .replace("{options}", &first.options.join(self.list_separator)),
            ),
        }
    }
}

/// Whether a reply is worth speaking: several words, or one long unspaced
/// run for scripts written without spaces.
pub fn is_substantive(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let words = trimmed.split_whitespace().count();
    words >= 2 || (words == 1 && trimmed.chars().count() >= 4 && !trimmed.is_ascii())
}
